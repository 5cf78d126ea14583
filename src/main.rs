use anyhow::Context;
use dialog_resolver::api::{self, app_state::AppState};
use dialog_resolver::config::loader::ConfigLoader;
use dialog_resolver::observability::{
    ObservabilityState, ResolverMetrics, create_observability_router, init_tracing,
};
use dialog_resolver::search::create_delivery_client;
use dialog_resolver::services::create_resolution_service;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

const CACHE_CLEANUP_PERIOD: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::load().context("failed to load configuration")?;
    ConfigLoader::validate(&config)?;

    let _log_guard = init_tracing(&config.logging);
    info!("Starting dialog-resolver...");
    info!("Configuration loaded successfully");

    let delivery_client = create_delivery_client(&config.delivery)?;
    info!("Delivery client initialized: {}", config.delivery.base_url);

    let metrics = Arc::new(ResolverMetrics::default());
    let resolution_service = create_resolution_service(
        &config.resolver,
        delivery_client.clone(),
        delivery_client,
        metrics.clone(),
    );
    info!(
        "Resolution service initialized (caching: {}, ttl: {}s)",
        config.resolver.caching_enabled, config.resolver.cache_ttl_seconds
    );

    let cache = resolution_service.cache().clone();
    if cache.is_enabled() {
        let cleanup_cache = cache.clone();
        tokio::spawn(async move { cleanup_cache.cleanup_task(CACHE_CLEANUP_PERIOD).await });
    }

    let app_state = AppState::new(resolution_service);

    // 创建可观测性状态并集成路由
    let observability_state = Arc::new(
        ObservabilityState::new(env!("CARGO_PKG_VERSION").to_string(), metrics).with_cache(cache),
    );
    let router = create_observability_router(observability_state)
        .merge(api::create_router(app_state))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout,
        )));
    info!("API router created with observability endpoints");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
