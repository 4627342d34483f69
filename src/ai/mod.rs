//! AI orchestration layer
//!
//! Issues the three external analysis calls (match scoring, alternative
//! ranking, insight generation) through cache -> rate limit -> bounded
//! timeout -> retry with backoff -> repair -> schema validation, against an
//! ordered list of generative-text providers. Every failure surfaces as a
//! typed `AppError`; nothing escapes this boundary as a panic.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    models::{
        CandidateProduct, FactorBreakdown, MatchScoreAnalysis, Product, Recommendation,
        RecommendationAnalysis, UserCriteria, UserPatterns,
    },
};

pub mod cache;
pub mod providers;
pub mod rate_limit;
pub mod repair;

pub use cache::ResponseCache;
pub use providers::AiProvider;
pub use rate_limit::RateLimiter;

/// Match-score and insight text go stale slowly
const MATCH_SCORE_TTL: Duration = Duration::from_secs(900);
const INSIGHTS_TTL: Duration = Duration::from_secs(900);
/// Alternative rankings track a moving market, keep them short-lived
const ALTERNATIVES_TTL: Duration = Duration::from_secs(300);

const CALL_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Ranked alternatives returned at most, mirroring the deterministic path
const MAX_ALTERNATIVES: usize = 5;

/// Coordinates cache, rate limiting, retries and validation for AI calls
pub struct AiOrchestrator {
    providers: Vec<Box<dyn AiProvider>>,
    cache: Arc<ResponseCache>,
    limiter: Arc<RateLimiter>,
    call_timeout: Duration,
}

impl AiOrchestrator {
    pub fn new(
        providers: Vec<Box<dyn AiProvider>>,
        cache: Arc<ResponseCache>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            providers,
            cache,
            limiter,
            call_timeout: CALL_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// AI-judged match score for the product under consideration.
    pub async fn match_score(
        &self,
        product: &Product,
        criteria: &UserCriteria,
        patterns: &UserPatterns,
    ) -> AppResult<MatchScoreAnalysis> {
        let key = format!(
            "match:{:016x}",
            fingerprint(&[&product_key(product), &profile_key(criteria, patterns)])
        );

        if let Some(hit) = self.cached::<MatchScoreAnalysis>(&key) {
            return Ok(hit);
        }

        let prompt = build_match_prompt(product, criteria, patterns);
        let value = self.call_for_json(&prompt).await?;
        let analysis = parse_match_score(&value)?;

        self.store(&key, &analysis, MATCH_SCORE_TTL);
        Ok(analysis)
    }

    /// AI-ranked alternatives drawn from the given candidate set.
    pub async fn rank_alternatives(
        &self,
        product: &Product,
        candidates: &[CandidateProduct],
        criteria: &UserCriteria,
        patterns: &UserPatterns,
    ) -> AppResult<Vec<RecommendationAnalysis>> {
        let candidate_ids: Vec<&str> = candidates
            .iter()
            .map(|c| c.product.id.as_str())
            .collect();
        let key = format!(
            "alts:{:016x}",
            fingerprint(&[
                &product_key(product),
                &profile_key(criteria, patterns),
                &candidate_ids.join(","),
            ])
        );

        if let Some(hit) = self.cached::<Vec<RecommendationAnalysis>>(&key) {
            return Ok(hit);
        }

        let prompt = build_alternatives_prompt(product, candidates, criteria, patterns);
        let value = self.call_for_json(&prompt).await?;
        let ranked = parse_alternatives(&value, product, candidates)?;

        self.store(&key, &ranked, ALTERNATIVES_TTL);
        Ok(ranked)
    }

    /// Free-text shopping insights; optional enrichment for the caller.
    pub async fn generate_insights(
        &self,
        product: &Product,
        criteria: &UserCriteria,
        patterns: &UserPatterns,
    ) -> AppResult<Vec<String>> {
        let key = format!(
            "insights:{:016x}",
            fingerprint(&[&product_key(product), &profile_key(criteria, patterns)])
        );

        if let Some(hit) = self.cached::<Vec<String>>(&key) {
            return Ok(hit);
        }

        let prompt = build_insights_prompt(product, criteria, patterns);
        let value = self.call_for_json(&prompt).await?;
        let insights = parse_insights(&value)?;

        self.store(&key, &insights, INSIGHTS_TTL);
        Ok(insights)
    }

    fn cached<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let payload = self.cache.get(key)?;
        match serde_json::from_str(&payload) {
            Ok(value) => {
                tracing::debug!(key, "AI cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding undeserializable cache entry");
                None
            }
        }
    }

    fn store<T: serde::Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_string(value) {
            Ok(payload) => self.cache.set(key, payload, ttl),
            Err(e) => tracing::error!(key, error = %e, "Cache serialization failed"),
        }
    }

    /// Calls providers in order until one yields a repaired JSON value.
    ///
    /// A rate-limited or exhausted provider is skipped in favor of the
    /// next; with every provider down the last typed error is returned.
    async fn call_for_json(&self, prompt: &str) -> AppResult<Value> {
        if self.providers.is_empty() {
            return Err(AppError::Config(
                "no AI provider credentials configured".to_string(),
            ));
        }

        let mut last_error = None;
        for provider in &self.providers {
            if let Err(e) = self.limiter.check(provider.name()) {
                last_error = Some(e);
                continue;
            }

            match self.call_with_retry(provider.as_ref(), prompt).await {
                Ok(text) => {
                    return repair::extract_json(&text).ok_or_else(|| {
                        AppError::Parse(format!(
                            "no JSON value recoverable from {} reply",
                            provider.name()
                        ))
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        provider = provider.name(),
                        error = %e,
                        "AI provider failed, trying next"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::Internal("no provider attempted".to_string())))
    }

    /// One provider, raced against the call timeout, retried with
    /// exponential backoff on transient failures only.
    async fn call_with_retry(&self, provider: &dyn AiProvider, prompt: &str) -> AppResult<String> {
        let mut attempt: u32 = 0;
        loop {
            let result = match tokio::time::timeout(self.call_timeout, provider.complete(prompt))
                .await
            {
                Ok(inner) => inner,
                Err(_) => Err(AppError::Timeout(format!(
                    "{} call exceeded {:?}",
                    provider.name(),
                    self.call_timeout
                ))),
            };

            match result {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                    let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                    tracing::warn!(
                        provider = provider.name(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient AI failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// ============================================================================
// Fingerprinting
// ============================================================================

/// Stable key over the semantically relevant request content. Volatile
/// fields (timestamps, display strings, URLs) stay out of the hash.
fn fingerprint(parts: &[&str]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for part in parts {
        part.hash(&mut hasher);
    }
    hasher.finish()
}

fn product_key(product: &Product) -> String {
    format!(
        "{}|{:.2}|{}|{}",
        product.id,
        product.price,
        product.category,
        product.rating.map_or_else(|| "-".to_string(), |r| format!("{:.1}", r))
    )
}

fn profile_key(criteria: &UserCriteria, patterns: &UserPatterns) -> String {
    let goals: Vec<String> = criteria
        .goals
        .iter()
        .map(|g| format!("{}:{:.2}", g.id, g.weight))
        .collect();
    format!(
        "goals={};tier={:?};max={:?};wtp={};alp={:.2};adp={:.2};qt={:.2};pref={};avoid={}",
        goals.join(","),
        criteria.price_sensitivity.tier,
        criteria.price_sensitivity.max_price,
        criteria.price_sensitivity.willing_to_pay_more,
        patterns.avg_liked_price,
        patterns.avg_disliked_price,
        patterns.quality_threshold,
        patterns.preferred_categories.join(","),
        patterns.avoided_categories.join(","),
    )
}

// ============================================================================
// Prompts
// ============================================================================

fn profile_summary(criteria: &UserCriteria, patterns: &UserPatterns) -> String {
    serde_json::json!({
        "goals": criteria.goals,
        "price_sensitivity": criteria.price_sensitivity,
        "patterns": patterns,
    })
    .to_string()
}

fn product_summary(product: &Product) -> String {
    serde_json::json!({
        "id": product.id,
        "title": product.title,
        "price": product.price,
        "category": product.category,
        "rating": product.rating,
        "features": product.features,
    })
    .to_string()
}

fn build_match_prompt(
    product: &Product,
    criteria: &UserCriteria,
    patterns: &UserPatterns,
) -> String {
    format!(
        r#"You are a shopping advisor. Judge how well this product matches the shopper.

Shopper profile: {}
Product: {}

Respond with ONLY a JSON object, no prose:
{{
  "score": 0.0-1.0,
  "recommendation": "buy" | "consider" | "skip",
  "reasons": ["short human-readable reason", ...],
  "confidence": 0.0-1.0,
  "factors": {{
    "price": {{"score": -1.0-1.0, "reason": "..."}},
    "quality": {{"score": -1.0-1.0, "reason": "..."}},
    "goals": {{"score": -1.0-1.0, "reason": "..."}},
    "category": {{"score": -1.0-1.0, "reason": "..."}}
  }}
}}"#,
        profile_summary(criteria, patterns),
        product_summary(product),
    )
}

fn build_alternatives_prompt(
    product: &Product,
    candidates: &[CandidateProduct],
    criteria: &UserCriteria,
    patterns: &UserPatterns,
) -> String {
    let candidate_list: Vec<String> = candidates
        .iter()
        .map(|c| product_summary(&c.product))
        .collect();
    format!(
        r#"You are a shopping advisor. Rank these alternative products against the one the shopper is considering.

Shopper profile: {}
Considering: {}
Candidates:
{}

Respond with ONLY a JSON array ordered best-first, no prose:
[
  {{"id": "candidate id", "score": 0.0-1.0, "reasons": ["why it is a good swap", ...]}}
]
Only include candidates genuinely worth switching to."#,
        profile_summary(criteria, patterns),
        product_summary(product),
        candidate_list.join("\n"),
    )
}

fn build_insights_prompt(
    product: &Product,
    criteria: &UserCriteria,
    patterns: &UserPatterns,
) -> String {
    format!(
        r#"You are a shopping advisor. Give the shopper 2-4 short insights about this purchase: price context, quality signals, fit with their goals.

Shopper profile: {}
Product: {}

Respond with ONLY a JSON array of strings, no prose."#,
        profile_summary(criteria, patterns),
        product_summary(product),
    )
}

// ============================================================================
// Schema validation
// ============================================================================

fn unit_interval(value: &Value, field: &str) -> AppResult<f64> {
    let number = value
        .as_f64()
        .ok_or_else(|| AppError::Validation(format!("{} is not a number", field)))?;
    if !(0.0..=1.0).contains(&number) {
        return Err(AppError::Validation(format!(
            "{} = {} outside 0..=1",
            field, number
        )));
    }
    Ok(number)
}

fn string_array(value: &Value, field: &str) -> AppResult<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| AppError::Validation(format!("{} is not an array", field)))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(String::from)
                .ok_or_else(|| AppError::Validation(format!("{} carries a non-string entry", field)))
        })
        .collect()
}

/// Validates an AI match-score reply against the expected schema.
///
/// The recommendation bucket is recomputed from the validated score so the
/// score/recommendation invariant holds regardless of what the model wrote.
fn parse_match_score(value: &Value) -> AppResult<MatchScoreAnalysis> {
    let object = value
        .as_object()
        .ok_or_else(|| AppError::Validation("match-score reply is not an object".to_string()))?;

    let score = unit_interval(
        object
            .get("score")
            .ok_or_else(|| AppError::Validation("match-score reply missing score".to_string()))?,
        "score",
    )?;

    let reasons = string_array(
        object
            .get("reasons")
            .ok_or_else(|| AppError::Validation("match-score reply missing reasons".to_string()))?,
        "reasons",
    )?;

    let confidence = match object.get("confidence") {
        Some(Value::Null) | None => None,
        Some(v) => Some(unit_interval(v, "confidence")?),
    };

    let factors = match object.get("factors") {
        Some(Value::Null) | None => None,
        Some(v) => Some(
            serde_json::from_value::<FactorBreakdown>(v.clone())
                .map_err(|e| AppError::Validation(format!("factors malformed: {}", e)))?,
        ),
    };

    Ok(MatchScoreAnalysis {
        score,
        recommendation: Recommendation::from_score(score),
        reasons,
        confidence,
        factors,
    })
}

/// Validates an AI ranking reply and joins it back onto the candidate set.
///
/// Entries referencing unknown candidate ids are dropped (the model
/// occasionally invents products); anything else malformed fails the whole
/// reply. Ordering and the top-5 cut are enforced locally.
fn parse_alternatives(
    value: &Value,
    target: &Product,
    candidates: &[CandidateProduct],
) -> AppResult<Vec<RecommendationAnalysis>> {
    let items = value
        .as_array()
        .ok_or_else(|| AppError::Validation("ranking reply is not an array".to_string()))?;

    let mut ranked = Vec::new();
    for item in items {
        let id = item
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Validation("ranking entry missing id".to_string()))?;

        let Some(candidate) = candidates.iter().find(|c| c.product.id == id) else {
            tracing::debug!(id, "Ranking entry references unknown candidate, dropped");
            continue;
        };

        let score = unit_interval(
            item.get("score")
                .ok_or_else(|| AppError::Validation("ranking entry missing score".to_string()))?,
            "score",
        )?;

        let mut reasons = match item.get("reasons") {
            Some(v) => string_array(v, "reasons")?,
            None => Vec::new(),
        };
        if let Some(why) = &candidate.why {
            if !reasons.contains(why) {
                reasons.push(why.clone());
            }
        }

        let savings = target.price - candidate.product.price;
        let savings = (savings > 0.0).then_some(savings);

        ranked.push(RecommendationAnalysis {
            product: candidate.product.clone(),
            score,
            reasons,
            savings,
        });
    }

    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(MAX_ALTERNATIVES);
    Ok(ranked)
}

fn parse_insights(value: &Value) -> AppResult<Vec<String>> {
    string_array(value, "insights")
}
