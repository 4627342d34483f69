//! OpenAI chat-completions provider
//!
//! Primary generative-text service. Sends the analysis prompt as a single
//! user message and lifts the first choice's content out of the envelope.

use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;

use crate::{
    ai::providers::AiProvider,
    error::{AppError, AppResult},
};

const MAX_TOKENS: u32 = 1024;
const TEMPERATURE: f64 = 0.3;

#[derive(Clone)]
pub struct OpenAiProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenAiProvider {
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
impl AiProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, prompt: &str) -> AppResult<String> {
        let url = format!("{}/v1/chat/completions", self.api_url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [{"role": "user", "content": prompt}],
                "temperature": TEMPERATURE,
                "max_tokens": MAX_TOKENS,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                provider = "openai",
                status = %status,
                "AI completion request failed"
            );
            return Err(AppError::Upstream {
                status: status.as_u16(),
                message: body,
            });
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Parse(format!("OpenAI envelope: {}", e)))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::Parse("OpenAI reply carried no choices".to_string()))?;

        tracing::debug!(
            provider = "openai",
            reply_len = content.len(),
            "AI completion received"
        );

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_deserialization() {
        let json = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "{\"score\": 0.8}"}}
            ]
        }"#;

        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.choices[0].message.content, r#"{"score": 0.8}"#);
    }

    #[test]
    fn test_empty_choices_deserialize() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(response.choices.is_empty());
    }
}
