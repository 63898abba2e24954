//! REST API Routes Module
//!
//! Includes:
//! - Page content read/write routes
//! - Cache refresh and statistics
//! - Administration (page listing, key normalization, tree import)
//! - Health check endpoints (Kubernetes-compatible)
//! - CORS support for the browser-based site editor

pub mod admin;
pub mod cache;
pub mod content;
pub mod health;

use axum::{
    error_handling::HandleErrorLayer,
    http::{header, Method},
    response::IntoResponse,
    routing::get,
    BoxError, Json, Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

// ============================================================================
// OPENAPI ENDPOINT
// ============================================================================

/// Handler for /openapi.json endpoint.
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

// ============================================================================
// FALLBACKS
// ============================================================================

async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!("Request timed out");
        ApiError::timeout("request")
    } else {
        tracing::error!(error = %err, "Unhandled middleware error");
        ApiError::internal_error("Unhandled middleware error")
    }
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any).allow_headers(Any)
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS: Production mode");
        let origins: Vec<header::HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the complete API router.
///
/// - Page content at /content/{pageId}
/// - Cache management under /cache
/// - Page listing at /pages and administration under /admin
/// - Health checks at /health/*
/// - OpenAPI spec at /openapi.json
///
/// Layers, outer to inner: CORS, request tracing, timeout.
pub fn create_api_router(state: AppState, config: &ApiConfig) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(handle_middleware_error))
        .timeout(config.request_timeout);

    Router::new()
        .nest("/content", content::create_router())
        .nest("/cache", cache::create_router())
        .nest("/admin", admin::create_router())
        .route("/pages", get(admin::list_pages))
        .nest("/health", health::create_router())
        .route("/openapi.json", get(openapi_json))
        .fallback(route_not_found)
        .layer(middleware)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(config))
        .with_state(state)
}
