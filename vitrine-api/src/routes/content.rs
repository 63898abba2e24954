//! Page Content REST API Routes
//!
//! Read and write paths for page text. Reads assemble the page tree from
//! the page's own rows plus shared rows; writes store each edit as one row.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use vitrine_storage::{ContentService, EditRequest};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    types::{ContentResponse, LocaleQuery, UpdateContentRequest, UpdateContentResponse},
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /content/{page_id} - Assembled page tree
#[utoipa::path(
    get,
    path = "/content/{page_id}",
    tag = "Content",
    params(
        ("page_id" = String, Path, description = "Page identifier, e.g. `tratamentos`"),
        ("locale" = Option<String>, Query, description = "Locale to resolve values with"),
    ),
    responses(
        (status = 200, description = "Assembled page content", body = ContentResponse),
        (status = 404, description = "No rows for the page or shared scope", body = ApiError),
        (status = 500, description = "Backing store failure", body = ApiError),
    ),
)]
pub async fn get_content(
    State(content): State<Arc<ContentService>>,
    Path(page_id): Path<String>,
    Query(query): Query<LocaleQuery>,
) -> ApiResult<Json<ContentResponse>> {
    let page = content
        .get_page_content(&page_id, query.locale.as_deref())
        .await?;
    Ok(Json(page.into()))
}

/// PUT /content/{page_id} - Apply editor changes
#[utoipa::path(
    put,
    path = "/content/{page_id}",
    tag = "Content",
    params(
        ("page_id" = String, Path, description = "Page the edits were made on"),
    ),
    request_body = UpdateContentRequest,
    responses(
        (status = 200, description = "Edits stored", body = UpdateContentResponse),
        (status = 400, description = "Missing edits map", body = ApiError),
        (status = 500, description = "Backing store failure, nothing stored", body = ApiError),
    ),
)]
pub async fn update_content(
    State(content): State<Arc<ContentService>>,
    Path(page_id): Path<String>,
    Json(req): Json<UpdateContentRequest>,
) -> ApiResult<Json<UpdateContentResponse>> {
    let edits = req.edits.ok_or_else(|| ApiError::missing_field("edits"))?;
    let edits: BTreeMap<String, EditRequest> = edits
        .into_iter()
        .map(|(key, payload)| (key, payload.into()))
        .collect();

    let report = content.apply_edits(&page_id, &edits).await?;
    tracing::info!(
        page_id = %page_id,
        updated = report.applied_count,
        skipped = report.skipped,
        "Content updated"
    );
    Ok(Json(report.into()))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new().route("/:page_id", get(get_content).put(update_content))
}
