use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use cartwise_api::{
    ai::{
        cache::{spawn_sweeper, SWEEP_INTERVAL},
        providers::{AnthropicProvider, OpenAiProvider},
        AiOrchestrator, AiProvider, RateLimiter, ResponseCache,
    },
    api::{create_router, AppState},
    config::Config,
    services::{
        pipeline::AnalysisPipeline,
        search::{AlternativeSource, HttpSearchSource},
        telemetry::LogTelemetry,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let mut providers: Vec<Box<dyn AiProvider>> = Vec::new();
    if let Some(key) = config.openai_api_key.clone() {
        providers.push(Box::new(OpenAiProvider::new(
            key,
            config.openai_api_url.clone(),
            config.openai_model.clone(),
        )));
    }
    if let Some(key) = config.anthropic_api_key.clone() {
        providers.push(Box::new(AnthropicProvider::new(
            key,
            config.anthropic_api_url.clone(),
            config.anthropic_model.clone(),
        )));
    }
    if providers.is_empty() {
        tracing::warn!("No AI credentials configured, every analysis will use the deterministic scorer");
    } else {
        tracing::info!(count = providers.len(), "AI providers configured");
    }

    let cache = Arc::new(ResponseCache::new());
    spawn_sweeper(cache.clone(), SWEEP_INTERVAL);

    let orchestrator = Arc::new(AiOrchestrator::new(
        providers,
        cache,
        Arc::new(RateLimiter::default()),
    ));

    let search: Option<Arc<dyn AlternativeSource>> = config
        .search_api_url
        .clone()
        .map(|url| {
            Arc::new(HttpSearchSource::new(url, config.search_api_key.clone()))
                as Arc<dyn AlternativeSource>
        });
    if search.is_none() {
        tracing::info!("No product search configured, ranking will use synthesized candidates");
    }

    let telemetry = Arc::new(LogTelemetry);
    let pipeline = Arc::new(AnalysisPipeline::new(
        orchestrator,
        search,
        telemetry.clone(),
    ));
    let state = AppState::new(pipeline, telemetry);

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
