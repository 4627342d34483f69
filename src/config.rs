use serde::Deserialize;

/// Application configuration loaded from environment variables
///
/// Both AI credentials and the alternative-search endpoint are optional: a
/// missing credential disables that provider, and with no providers at all
/// the pipeline runs entirely on the deterministic scorer.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// OpenAI API key (optional - provider disabled when absent)
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL
    #[serde(default = "default_openai_api_url")]
    pub openai_api_url: String,

    /// OpenAI model used for analysis calls
    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    /// Anthropic API key (optional - provider disabled when absent)
    pub anthropic_api_key: Option<String>,

    /// Anthropic API base URL
    #[serde(default = "default_anthropic_api_url")]
    pub anthropic_api_url: String,

    /// Anthropic model used for analysis calls
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,

    /// Alternative-product search endpoint (optional - placeholder
    /// alternatives are used when absent)
    pub search_api_url: Option<String>,

    /// Alternative-product search API key
    pub search_api_key: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_openai_api_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_anthropic_api_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-haiku-20241022".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
