use allure::api::{self, app_state::AppState};
use allure::config::loader::{ConfigLoader, config_exists, default_config_path};
use allure::observability::{EngineMetrics, ObservabilityState, create_observability_router, init_tracing};
use allure::providers::create_providers;
use allure::services::PreferenceEngine;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load()?;
    let _log_guard = init_tracing(&config.logging)?;

    if !config_exists() {
        info!("{} not found, using defaults and environment", default_config_path().display());
    }
    ConfigLoader::validate(&config)?;
    info!("Configuration loaded successfully");

    let (source, oracle) = create_providers(&config.provider)?;
    info!("Providers initialized (backend: {})", config.provider.backend);

    let metrics = Arc::new(EngineMetrics::default());
    let engine = PreferenceEngine::new(
        &config.engine,
        Duration::from_secs(config.provider.request_timeout_secs),
        source,
        oracle,
        metrics.clone(),
    );

    match engine.start().await {
        Ok(loaded) => info!("Loaded initial batch of {} profiles", loaded),
        Err(e) => warn!("Initial profile batch failed, retry via /api/v1/feed/replenish: {}", e),
    }

    let observability_state = Arc::new(ObservabilityState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        config.provider.backend.clone(),
        metrics,
    ));
    let api_router = api::initialize_api(AppState::new(engine)).await?;
    let router = create_observability_router(observability_state).merge(api_router);
    info!("API router created with observability endpoints");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
