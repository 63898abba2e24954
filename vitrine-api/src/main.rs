//! VITRINE API Server Entry Point
//!
//! Bootstraps configuration, prepares the PostgreSQL schema, opens the page
//! cache and starts the Axum HTTP server. Ctrl-C stops new connections,
//! lets in-flight requests finish and flushes the cache.

use std::sync::Arc;

use axum::Router;
use vitrine_api::telemetry::{init_tracing, TelemetryConfig};
use vitrine_api::{
    create_api_router, serve, shutdown_signal, ApiConfig, ApiError, ApiResult, AppState, DbClient,
    DbConfig,
};
use vitrine_core::{ContentConfig, ContentError};
use vitrine_storage::{CacheSettings, ContentService};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::from_env();
    init_tracing(&telemetry_config)?;

    let content_config = ContentConfig::from_env().map_err(ContentError::from)?;
    let cache_settings = CacheSettings::from_env().map_err(ContentError::from)?;
    let api_config = ApiConfig::from_env();

    let db_config = DbConfig::from_env();
    let db = DbClient::from_config(&db_config)?;
    db.ensure_schema().await?;

    let mut service = ContentService::new(Arc::new(db), content_config);
    match cache_settings.open().map_err(ContentError::from)? {
        Some(cache) => {
            tracing::info!(path = %cache_settings.path.display(), "Page cache enabled");
            service = service.with_cache(cache);
        }
        None => tracing::info!("Page cache disabled"),
    }
    let service = Arc::new(service);

    let app: Router = create_api_router(AppState::new(service.clone()), &api_config);

    let addr = api_config.bind_addr()?;
    tracing::info!(%addr, "Starting VITRINE API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    serve(listener, app, shutdown_signal()).await?;

    if let Some(cache) = service.cache() {
        if let Err(e) = cache.flush().await {
            tracing::warn!(error = %e, "Cache flush on shutdown failed");
        }
    }
    Ok(())
}
