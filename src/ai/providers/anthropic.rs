//! Anthropic messages provider
//!
//! Secondary generative-text service, used when the primary is rate-limited
//! or failing. Same prompt-in/text-out contract as the primary.

use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;

use crate::{
    ai::providers::AiProvider,
    error::{AppError, AppResult},
};

const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

#[derive(Clone)]
pub struct AnthropicProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicProvider {
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            model,
        }
    }
}

#[async_trait::async_trait]
impl AiProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn complete(&self, prompt: &str) -> AppResult<String> {
        let url = format!("{}/v1/messages", self.api_url);

        let response = self
            .http_client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&json!({
                "model": self.model,
                "max_tokens": MAX_TOKENS,
                "messages": [{"role": "user", "content": prompt}],
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                provider = "anthropic",
                status = %status,
                "AI completion request failed"
            );
            return Err(AppError::Upstream {
                status: status.as_u16(),
                message: body,
            });
        }

        let completion: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AppError::Parse(format!("Anthropic envelope: {}", e)))?;

        let content = completion
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| AppError::Parse("Anthropic reply carried no text block".to_string()))?;

        tracing::debug!(
            provider = "anthropic",
            reply_len = content.len(),
            "AI completion received"
        );

        Ok(content)
    }
}
