//! Alternative product discovery
//!
//! Candidates come from an external product-search service when one is
//! configured. The pipeline treats discovery as best-effort: a failed or
//! absent source degrades to synthesized placeholders, never to an error.

use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::{AppError, AppResult},
    models::{CandidateProduct, Product, UserCriteria, UserPatterns},
};

const MAX_RESULTS: usize = 10;

/// Trait for candidate product sources
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AlternativeSource: Send + Sync {
    async fn find_alternatives(
        &self,
        product: &Product,
        criteria: &UserCriteria,
        patterns: &UserPatterns,
    ) -> AppResult<Vec<CandidateProduct>>;
}

/// Product search backed by an external HTTP API
#[derive(Clone)]
pub struct HttpSearchSource {
    http_client: HttpClient,
    api_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<CandidateProduct>,
}

impl HttpSearchSource {
    pub fn new(api_url: String, api_key: Option<String>) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl AlternativeSource for HttpSearchSource {
    async fn find_alternatives(
        &self,
        product: &Product,
        criteria: &UserCriteria,
        _patterns: &UserPatterns,
    ) -> AppResult<Vec<CandidateProduct>> {
        let url = format!("{}/search", self.api_url);

        let mut request = self.http_client.post(&url).json(&json!({
            "query": product.title,
            "category": product.category,
            "max_price": criteria.price_sensitivity.max_price,
            "limit": MAX_RESULTS,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!(%status, "Product search request failed");
            return Err(AppError::Upstream {
                status: status.as_u16(),
                message: "product search failed".to_string(),
            });
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::Parse(format!("search envelope: {}", e)))?;

        // Never hand the considered product back as its own alternative
        let candidates: Vec<CandidateProduct> = search
            .results
            .into_iter()
            .filter(|c| c.product.id != product.id)
            .take(MAX_RESULTS)
            .collect();

        tracing::debug!(count = candidates.len(), "Product search returned candidates");
        Ok(candidates)
    }
}
