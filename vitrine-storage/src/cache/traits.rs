//! Page cache trait and cached page record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vitrine_core::ContentResult;

/// One assembled page tree as stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedPage {
    pub page_id: String,
    pub content: Value,
    /// Rows the tree was assembled from.
    pub entry_count: usize,
    pub cached_at: DateTime<Utc>,
    /// Write generation observed when the rows were fetched.
    pub generation: u64,
}

impl CachedPage {
    pub fn new(page_id: impl Into<String>, content: Value, entry_count: usize, generation: u64) -> Self {
        Self {
            page_id: page_id.into(),
            content,
            entry_count,
            cached_at: Utc::now(),
            generation,
        }
    }
}

/// Disposable store of assembled page trees keyed by page id.
///
/// Implementations must be safe for concurrent use. The content service
/// clears the whole cache after every successful write.
#[async_trait]
pub trait PageCache: Send + Sync {
    async fn get(&self, page_id: &str) -> ContentResult<Option<CachedPage>>;

    /// Insert or replace the entry for `page.page_id`.
    async fn put(&self, page: &CachedPage) -> ContentResult<()>;

    /// Returns true if an entry was removed.
    async fn remove(&self, page_id: &str) -> ContentResult<bool>;

    async fn keys(&self) -> ContentResult<Vec<String>>;

    /// Drop every entry and return how many were removed.
    async fn clear(&self) -> ContentResult<u64>;

    /// Block until previous writes are durable.
    async fn flush(&self) -> ContentResult<()>;

    async fn stats(&self) -> ContentResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entry_count: u64,
    /// Bytes written by `put` since startup.
    pub bytes_written: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_cached_page_serializes_camel_case() {
        let page = CachedPage::new("home", serde_json::json!({"a": "b"}), 3, 7);
        let json = serde_json::to_value(&page).expect("serialize should succeed");
        assert_eq!(json["pageId"], "home");
        assert_eq!(json["entryCount"], 3);
        assert_eq!(json["generation"], 7);
    }
}
