use std::sync::Arc;

use crate::services::{pipeline::AnalysisPipeline, telemetry::DecisionTelemetry};

/// Shared application state
///
/// Everything behind an `Arc`: handlers clone the state per request and the
/// pipeline and telemetry sink are shared across all of them.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AnalysisPipeline>,
    pub telemetry: Arc<dyn DecisionTelemetry>,
}

impl AppState {
    pub fn new(pipeline: Arc<AnalysisPipeline>, telemetry: Arc<dyn DecisionTelemetry>) -> Self {
        Self {
            pipeline,
            telemetry,
        }
    }
}
