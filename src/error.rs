use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
///
/// Everything the AI orchestration layer can fail with is a variant here, so
/// the fallback controller can treat any of them uniformly as "AI path
/// failed" for one call type without catching panics or downcasting.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rate limit exceeded, retry in {wait:?}")]
    RateLimited { wait: Duration },

    #[error("Upstream service returned status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Unparseable response: {0}")]
    Parse(String),

    #[error("Response failed validation: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether a retry with backoff is worth attempting.
    ///
    /// Timeouts, transport errors and 5xx-class upstream responses are
    /// transient. Everything else (client errors, rate limits, parse and
    /// schema failures) is not retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Timeout(_) | AppError::Network(_) => true,
            AppError::Upstream { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AppError::Timeout(_)
            | AppError::Network(_)
            | AppError::Upstream { .. }
            | AppError::Parse(_)
            | AppError::Validation(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::Config(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
