//! Decision telemetry
//!
//! Records which recommendation the shopper actually followed. Recording is
//! infallible from the caller's point of view: a sink that cannot persist an
//! event logs and drops it.

use crate::models::DecisionEvent;

/// Trait for decision event sinks
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DecisionTelemetry: Send + Sync {
    async fn record(&self, event: DecisionEvent);
}

/// Sink that emits decision events as structured log lines
#[derive(Debug, Default, Clone)]
pub struct LogTelemetry;

#[async_trait::async_trait]
impl DecisionTelemetry for LogTelemetry {
    async fn record(&self, event: DecisionEvent) {
        tracing::info!(
            product_id = %event.product_id,
            recommendation = ?event.recommendation,
            score = event.score,
            source = ?event.source,
            chosen_alternative = event.chosen_alternative.as_deref(),
            recorded_at = %event.recorded_at,
            "Decision recorded"
        );
    }
}
