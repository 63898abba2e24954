//! In-memory page cache.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use vitrine_core::{CacheError, ContentResult};

use super::traits::{CacheStats, CachedPage, PageCache};

/// Page cache held in process memory. Lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryPageCache {
    pages: RwLock<HashMap<String, CachedPage>>,
    stats: RwLock<CacheStats>,
}

impl InMemoryPageCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, hit: bool) {
        if let Ok(mut stats) = self.stats.write() {
            if hit {
                stats.hits += 1;
            } else {
                stats.misses += 1;
            }
        }
    }
}

#[async_trait]
impl PageCache for InMemoryPageCache {
    async fn get(&self, page_id: &str) -> ContentResult<Option<CachedPage>> {
        let pages = self.pages.read().map_err(|_| CacheError::LockPoisoned)?;
        let page = pages.get(page_id).cloned();
        self.record(page.is_some());
        Ok(page)
    }

    async fn put(&self, page: &CachedPage) -> ContentResult<()> {
        let size = serde_json::to_vec(&page.content)
            .map(|bytes| bytes.len() as u64)
            .unwrap_or(0);
        self.pages
            .write()
            .map_err(|_| CacheError::LockPoisoned)?
            .insert(page.page_id.clone(), page.clone());
        if let Ok(mut stats) = self.stats.write() {
            stats.bytes_written += size;
        }
        Ok(())
    }

    async fn remove(&self, page_id: &str) -> ContentResult<bool> {
        let mut pages = self.pages.write().map_err(|_| CacheError::LockPoisoned)?;
        Ok(pages.remove(page_id).is_some())
    }

    async fn keys(&self) -> ContentResult<Vec<String>> {
        let pages = self.pages.read().map_err(|_| CacheError::LockPoisoned)?;
        Ok(pages.keys().cloned().collect())
    }

    async fn clear(&self) -> ContentResult<u64> {
        let mut pages = self.pages.write().map_err(|_| CacheError::LockPoisoned)?;
        let removed = pages.len() as u64;
        pages.clear();
        Ok(removed)
    }

    async fn flush(&self) -> ContentResult<()> {
        Ok(())
    }

    async fn stats(&self) -> ContentResult<CacheStats> {
        let entry_count = self
            .pages
            .read()
            .map_err(|_| CacheError::LockPoisoned)?
            .len() as u64;
        let mut stats = self.stats.read().map(|s| s.clone()).unwrap_or_default();
        stats.entry_count = entry_count;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_get_clear() {
        let cache = InMemoryPageCache::new();
        assert!(cache.get("home").await.expect("get should succeed").is_none());

        cache
            .put(&CachedPage::new("home", json!({"a": "b"}), 1, 0))
            .await
            .expect("put should succeed");
        let hit = cache.get("home").await.expect("get should succeed");
        assert_eq!(hit.map(|page| page.content), Some(json!({"a": "b"})));

        let stats = cache.stats().await.expect("stats should succeed");
        assert_eq!((stats.hits, stats.misses, stats.entry_count), (1, 1, 1));

        assert_eq!(cache.clear().await.expect("clear should succeed"), 1);
        assert!(cache.keys().await.expect("keys should succeed").is_empty());
    }
}
