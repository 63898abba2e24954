//! Content Administration Routes
//!
//! Page listing, legacy key normalization and bulk import of nested trees.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use vitrine_core::Scope;
use vitrine_storage::ContentService;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    types::{ImportResponse, ImportTree, NormalizeResponse, PagesResponse},
};

/// GET /pages - Page ids that own at least one row
#[utoipa::path(
    get,
    path = "/pages",
    tag = "Admin",
    responses(
        (status = 200, description = "Known pages", body = PagesResponse),
        (status = 500, description = "Backing store failure", body = ApiError),
    ),
)]
pub async fn list_pages(
    State(content): State<Arc<ContentService>>,
) -> ApiResult<Json<PagesResponse>> {
    let pages = content.list_pages().await?;
    Ok(Json(PagesResponse { pages }))
}

/// POST /admin/normalize - Rewrite `<page>.`-prefixed keys to canonical form
#[utoipa::path(
    post,
    path = "/admin/normalize",
    tag = "Admin",
    responses(
        (status = 200, description = "Legacy keys normalized", body = NormalizeResponse),
        (status = 500, description = "Backing store failure, nothing changed", body = ApiError),
    ),
)]
pub async fn normalize_keys(
    State(content): State<Arc<ContentService>>,
) -> ApiResult<Json<NormalizeResponse>> {
    let report = content.normalize_legacy_keys().await?;
    Ok(Json(report.into()))
}

/// POST /admin/import/{scope} - Store every leaf of a nested tree
#[utoipa::path(
    post,
    path = "/admin/import/{scope}",
    tag = "Admin",
    params(
        ("scope" = String, Path, description = "Page id, or `__shared__` for shared content"),
    ),
    request_body = ImportTree,
    responses(
        (status = 200, description = "Tree imported", body = ImportResponse),
        (status = 400, description = "Body is not a JSON object", body = ApiError),
        (status = 500, description = "Backing store failure, nothing stored", body = ApiError),
    ),
)]
pub async fn import_tree(
    State(content): State<Arc<ContentService>>,
    Path(scope): Path<String>,
    Json(ImportTree(tree)): Json<ImportTree>,
) -> ApiResult<Json<ImportResponse>> {
    let report = content.import_tree(Scope::from(scope), &tree).await?;
    Ok(Json(report.into()))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/normalize", post(normalize_keys))
        .route("/import/:scope", post(import_tree))
}
