//! Generative-text AI provider abstraction
//!
//! Two independent external services sit behind the same contract: a single
//! structured prompt string goes in, free-form text comes out. The reply is
//! expected to contain one JSON value, optionally fenced and potentially
//! truncated; the orchestrator owns repair and validation, not the
//! providers.

use crate::error::AppResult;

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

/// Trait for generative-text providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AiProvider: Send + Sync {
    /// Provider name, used as the rate-limit service key and in logs
    fn name(&self) -> &'static str;

    /// Sends one prompt and returns the raw text reply.
    ///
    /// Implementations map transport failures to `AppError::Network` and
    /// non-success statuses to `AppError::Upstream` (5xx retryable, 4xx
    /// not). They never parse the reply body beyond lifting the text out of
    /// the provider's envelope.
    async fn complete(&self, prompt: &str) -> AppResult<String>;
}
