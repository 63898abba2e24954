//! OpenAPI Specification for VITRINE API
//!
//! Generated with utoipa from the route annotations and response types.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::health::{ComponentHealth, HealthDetails, HealthResponse, HealthStatus};
use crate::routes::{admin, cache, content, health};
use crate::types::*;

/// OpenAPI document for VITRINE API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "VITRINE API",
        version = "0.1.0",
        description = "Granular page content storage: flat text rows served as nested page trees",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Content", description = "Assembled page trees and inline edits"),
        (name = "Cache", description = "Assembled page cache"),
        (name = "Admin", description = "Page listing, key normalization and tree import"),
        (name = "Health", description = "Liveness and readiness probes")
    ),
    paths(
        // === Content Routes ===
        content::get_content,
        content::update_content,

        // === Cache Routes ===
        cache::refresh_cache,
        cache::cache_stats,

        // === Admin Routes ===
        admin::list_pages,
        admin::normalize_keys,
        admin::import_tree,

        // === Health Routes ===
        health::ping,
        health::liveness,
        health::readiness,
    ),
    components(
        schemas(
            // === Error Types ===
            ApiError, ErrorCode,

            // === Content Types ===
            ContentResponse, UpdateContentRequest, EditPayload,
            UpdateContentResponse, EditResultResponse,

            // === Cache Types ===
            RefreshCacheResponse, CacheStatsResponse,

            // === Admin Types ===
            PagesResponse, NormalizeResponse, ImportTree, ImportResponse,

            // === Health Types ===
            HealthResponse, HealthStatus, HealthDetails, ComponentHealth
        )
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}
