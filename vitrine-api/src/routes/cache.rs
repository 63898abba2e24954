//! Page Cache REST API Routes

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use vitrine_storage::ContentService;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    types::{CacheStatsResponse, RefreshCacheResponse},
};

/// POST /cache/refresh - Drop every cached page and rebuild from the store
#[utoipa::path(
    post,
    path = "/cache/refresh",
    tag = "Cache",
    responses(
        (status = 200, description = "Cache rebuilt", body = RefreshCacheResponse),
        (status = 500, description = "Store or cache failure", body = ApiError),
    ),
)]
pub async fn refresh_cache(
    State(content): State<Arc<ContentService>>,
) -> ApiResult<Json<RefreshCacheResponse>> {
    let report = content.refresh_cache().await?;
    Ok(Json(report.into()))
}

/// GET /cache/stats - Hit/miss counters and current write generation
#[utoipa::path(
    get,
    path = "/cache/stats",
    tag = "Cache",
    responses(
        (status = 200, description = "Cache statistics", body = CacheStatsResponse),
        (status = 500, description = "Cache backend failure", body = ApiError),
    ),
)]
pub async fn cache_stats(
    State(content): State<Arc<ContentService>>,
) -> ApiResult<Json<CacheStatsResponse>> {
    let generation = content.generation();
    let response = match content.cache() {
        Some(cache) => CacheStatsResponse::from_stats(true, generation, cache.stats().await?),
        None => CacheStatsResponse::disabled(generation),
    };
    Ok(Json(response))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/refresh", post(refresh_cache))
        .route("/stats", get(cache_stats))
}
