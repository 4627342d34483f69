use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::{
    AnalysisSource, DecisionEvent, Product, ProductAnalysis, Recommendation, UserCriteria,
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub product: Product,
    pub criteria: UserCriteria,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub product_id: String,
    pub recommendation: Recommendation,
    pub score: f64,
    pub source: AnalysisSource,
    pub chosen_alternative: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub status: &'static str,
}

// Handlers

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

/// POST /api/v1/analyze
///
/// Analysis itself cannot fail; the only error surface is input validation.
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> AppResult<Json<ProductAnalysis>> {
    request
        .product
        .validate()
        .map_err(AppError::InvalidInput)?;
    request
        .criteria
        .validate()
        .map_err(AppError::InvalidInput)?;
    for rated in request
        .criteria
        .liked_products
        .iter()
        .chain(&request.criteria.disliked_products)
    {
        rated.validate().map_err(AppError::InvalidInput)?;
    }

    let analysis = state
        .pipeline
        .analyze(&request.product, &request.criteria)
        .await;

    Ok(Json(analysis))
}

/// POST /api/v1/decisions
///
/// Accepts the event and records it off the request path; the shopper's
/// browser should never wait on telemetry.
pub async fn record_decision(
    State(state): State<AppState>,
    Json(request): Json<DecisionRequest>,
) -> AppResult<(StatusCode, Json<AcceptedResponse>)> {
    if request.product_id.trim().is_empty() {
        return Err(AppError::InvalidInput("product_id is empty".to_string()));
    }
    if !(0.0..=1.0).contains(&request.score) {
        return Err(AppError::InvalidInput(format!(
            "score {} outside 0..=1",
            request.score
        )));
    }

    let event = DecisionEvent {
        product_id: request.product_id,
        recommendation: request.recommendation,
        score: request.score,
        source: request.source,
        chosen_alternative: request.chosen_alternative,
        recorded_at: Utc::now(),
    };

    let telemetry = state.telemetry.clone();
    tokio::spawn(async move {
        telemetry.record(event).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse { status: "accepted" }),
    ))
}
