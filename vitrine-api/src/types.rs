//! Request and response types for the REST API.
//!
//! Field names are camelCase on the wire to match the site editor client.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use vitrine_core::Timestamp;
use vitrine_storage::{
    AssembledPage, CacheStats, EditReport, EditRequest, EditResult, ImportReport,
    NormalizeReport, RefreshReport,
};

// ============================================================================
// CONTENT
// ============================================================================

/// Query parameters for `GET /content/{pageId}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocaleQuery {
    /// Locale to resolve localized values with. Defaults to the site locale.
    pub locale: Option<String>,
}

/// Assembled page content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ContentResponse {
    pub success: bool,
    pub page_id: String,
    /// Nested page tree. Leaves are strings.
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub content: JsonValue,
    /// `cache` or `store`
    pub source: String,
    pub entry_count: usize,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = DateTime))]
    pub assembled_at: Timestamp,
}

impl From<AssembledPage> for ContentResponse {
    fn from(page: AssembledPage) -> Self {
        Self {
            success: true,
            page_id: page.page_id,
            content: page.content,
            source: page.source.as_str().to_string(),
            entry_count: page.entry_count,
            assembled_at: page.assembled_at,
        }
    }
}

/// One edit submitted by the inline editor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct EditPayload {
    /// Edits without text are ignored.
    pub new_text: Option<String>,
    /// Store under the shared scope regardless of the key prefix.
    pub is_shared: bool,
    /// Owner page when the edit targets another page's content.
    pub target_page: Option<String>,
}

impl From<EditPayload> for EditRequest {
    fn from(payload: EditPayload) -> Self {
        EditRequest {
            new_text: payload.new_text,
            is_shared: payload.is_shared,
            target_page: payload.target_page,
        }
    }
}

/// Body of `PUT /content/{pageId}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateContentRequest {
    /// Edits keyed by edit key (`treatments[0].details`, `__shared__.footer.copyright`).
    #[serde(default)]
    pub edits: Option<BTreeMap<String, EditPayload>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct EditResultResponse {
    pub edit_key: String,
    /// Scope the row was stored under.
    pub scope: String,
    /// Stored key.
    pub key: String,
}

impl From<EditResult> for EditResultResponse {
    fn from(result: EditResult) -> Self {
        Self {
            edit_key: result.edit_key,
            scope: result.scope,
            key: result.key,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UpdateContentResponse {
    pub success: bool,
    pub updated_count: usize,
    pub skipped: usize,
    pub results: Vec<EditResultResponse>,
    /// False when the write committed but clearing the cache failed.
    pub cache_invalidated: bool,
}

impl From<EditReport> for UpdateContentResponse {
    fn from(report: EditReport) -> Self {
        Self {
            success: true,
            updated_count: report.applied_count,
            skipped: report.skipped,
            results: report.results.into_iter().map(Into::into).collect(),
            cache_invalidated: report.cache_invalidated,
        }
    }
}

// ============================================================================
// CACHE
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RefreshCacheResponse {
    pub success: bool,
    pub cleared: u64,
    pub pages_cached: usize,
    pub entries_scanned: usize,
}

impl From<RefreshReport> for RefreshCacheResponse {
    fn from(report: RefreshReport) -> Self {
        Self {
            success: true,
            cleared: report.cleared,
            pages_cached: report.pages_cached,
            entries_scanned: report.entries_scanned,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsResponse {
    pub enabled: bool,
    /// Write generation; bumps on every invalidation.
    pub generation: u64,
    pub hits: u64,
    pub misses: u64,
    pub entry_count: u64,
    pub bytes_written: u64,
    pub hit_rate: f64,
}

impl CacheStatsResponse {
    pub fn disabled(generation: u64) -> Self {
        Self::from_stats(false, generation, CacheStats::default())
    }

    pub fn from_stats(enabled: bool, generation: u64, stats: CacheStats) -> Self {
        Self {
            enabled,
            generation,
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            entry_count: stats.entry_count,
            bytes_written: stats.bytes_written,
        }
    }
}

// ============================================================================
// ADMIN
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PagesResponse {
    pub pages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct NormalizeResponse {
    pub success: bool,
    /// Legacy rows moved to their canonical key.
    pub rewritten: usize,
    /// Legacy rows deleted because a newer canonical row existed.
    pub dropped: usize,
}

impl From<NormalizeReport> for NormalizeResponse {
    fn from(report: NormalizeReport) -> Self {
        Self {
            success: true,
            rewritten: report.rewritten,
            dropped: report.dropped,
        }
    }
}

/// Body of `POST /admin/import/{scope}`: a nested page tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "openapi", schema(value_type = Object))]
#[serde(transparent)]
pub struct ImportTree(pub JsonValue);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub success: bool,
    pub scope: String,
    pub imported_count: usize,
}

impl From<ImportReport> for ImportResponse {
    fn from(report: ImportReport) -> Self {
        Self {
            success: true,
            scope: report.scope,
            imported_count: report.imported_count,
        }
    }
}
