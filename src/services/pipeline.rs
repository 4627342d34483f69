//! Analysis pipeline
//!
//! The one entry point the HTTP layer calls. Fans out to pattern analysis,
//! candidate discovery and the three AI calls, and degrades each stage
//! independently: AI trouble falls back to the deterministic scorer, search
//! trouble falls back to synthesized candidates, and the caller always gets
//! a complete `ProductAnalysis` back. Analysis does not fail.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    ai::AiOrchestrator,
    models::{
        AnalysisSource, CandidateProduct, DecisionEvent, Product, ProductAnalysis, UserCriteria,
        UserPatterns,
    },
    services::{
        patterns::analyze_patterns,
        scorer,
        search::AlternativeSource,
        telemetry::DecisionTelemetry,
    },
};

pub struct AnalysisPipeline {
    orchestrator: Arc<AiOrchestrator>,
    search: Option<Arc<dyn AlternativeSource>>,
    telemetry: Arc<dyn DecisionTelemetry>,
}

impl AnalysisPipeline {
    pub fn new(
        orchestrator: Arc<AiOrchestrator>,
        search: Option<Arc<dyn AlternativeSource>>,
        telemetry: Arc<dyn DecisionTelemetry>,
    ) -> Self {
        Self {
            orchestrator,
            search,
            telemetry,
        }
    }

    /// Produces a full analysis for one product under one shopper profile.
    pub async fn analyze(&self, product: &Product, criteria: &UserCriteria) -> ProductAnalysis {
        let patterns = analyze_patterns(criteria);
        let candidates = self.discover_candidates(product, criteria, &patterns).await;

        let (match_result, ranking_result, insights_result) = tokio::join!(
            self.orchestrator.match_score(product, criteria, &patterns),
            self.orchestrator
                .rank_alternatives(product, &candidates, criteria, &patterns),
            self.orchestrator.generate_insights(product, criteria, &patterns),
        );

        let (recommendation, source) = match match_result {
            Ok(analysis) => (analysis, AnalysisSource::Ai),
            Err(e) => {
                tracing::warn!(
                    product_id = %product.id,
                    error = %e,
                    "AI match scoring unavailable, using deterministic scorer"
                );
                (
                    scorer::score_product(product, criteria, &patterns),
                    AnalysisSource::Heuristic,
                )
            }
        };

        let alternatives = match ranking_result {
            Ok(ranked) => ranked,
            Err(e) => {
                tracing::warn!(
                    product_id = %product.id,
                    error = %e,
                    "AI ranking unavailable, using deterministic ranking"
                );
                scorer::rank_alternatives(product, &candidates, criteria, &patterns)
            }
        };

        // Insights are pure enrichment; no deterministic stand-in exists
        let insights = match insights_result {
            Ok(lines) if !lines.is_empty() => Some(lines),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(product_id = %product.id, error = %e, "No AI insights available");
                None
            }
        };

        // Telemetry rides on a spawned task; the caller never waits on it
        let event = DecisionEvent {
            product_id: product.id.clone(),
            recommendation: recommendation.recommendation,
            score: recommendation.score,
            source,
            chosen_alternative: None,
            recorded_at: Utc::now(),
        };
        let telemetry = self.telemetry.clone();
        tokio::spawn(async move {
            telemetry.record(event).await;
        });

        ProductAnalysis {
            recommendation,
            source,
            alternatives,
            insights,
        }
    }

    /// Candidate set for ranking: the configured search source when it
    /// delivers, synthesized price variants of the target otherwise.
    async fn discover_candidates(
        &self,
        product: &Product,
        criteria: &UserCriteria,
        patterns: &UserPatterns,
    ) -> Vec<CandidateProduct> {
        if let Some(source) = &self.search {
            match source.find_alternatives(product, criteria, patterns).await {
                Ok(found) if !found.is_empty() => return found,
                Ok(_) => {
                    tracing::debug!(product_id = %product.id, "Product search found no candidates")
                }
                Err(e) => {
                    tracing::warn!(product_id = %product.id, error = %e, "Product search failed")
                }
            }
        }
        placeholder_candidates(product)
    }
}

/// Price variants of the considered product, used when no real candidates
/// are available so ranking still has material to work with.
fn placeholder_candidates(product: &Product) -> Vec<CandidateProduct> {
    let variants = [
        ("budget", 0.75, "Budget alternative"),
        ("value", 0.9, "Comparable option"),
        ("premium", 1.15, "Premium alternative"),
    ];

    variants
        .iter()
        .map(|(tag, factor, label)| {
            let price = product.price * factor;
            CandidateProduct {
                product: Product {
                    id: format!("{}-{}", product.id, tag),
                    title: format!("{} ({})", label, product.category),
                    price_display: format!("${:.2}", price),
                    price,
                    category: product.category.clone(),
                    rating: product.rating,
                    features: None,
                    url: None,
                },
                why: None,
            }
        })
        .collect()
}
