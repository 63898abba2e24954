//! LMDB-backed page cache.
//!
//! Uses the heed crate (Rust bindings for LMDB) to keep assembled page trees
//! in a memory-mapped file that survives restarts.
//!
//! # Layout
//!
//! One unnamed database, keyed by page id. Values are
//! `[cached_at millis: 8 bytes LE][JSON CachedPage body]`.
//!
//! # Thread Safety
//!
//! LMDB serves concurrent readers and serializes writers itself. Every
//! mutating call commits its own write transaction. Statistics are kept
//! behind a lock and never fail an operation.

use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vitrine_core::{CacheError, ContentError, ContentResult};

use super::traits::{CacheStats, CachedPage, PageCache};

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for ContentError {
    fn from(e: LmdbCacheError) -> Self {
        match e {
            LmdbCacheError::Serialization(reason) | LmdbCacheError::Deserialization(reason) => {
                ContentError::Cache(CacheError::Serialization { reason })
            }
            other => ContentError::Cache(CacheError::Backend {
                reason: other.to_string(),
            }),
        }
    }
}

/// Stored body; `cached_at` lives in the value prefix.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredPage {
    content: Value,
    entry_count: usize,
    generation: u64,
}

/// LMDB-backed page cache.
///
/// # Example
///
/// ```ignore
/// use vitrine_storage::{CachedPage, LmdbPageCache, PageCache};
///
/// let cache = LmdbPageCache::new(".vitrine/cache", 64)?;
/// cache.put(&CachedPage::new("home", tree, 12, 0)).await?;
/// let hit = cache.get("home").await?;
/// ```
pub struct LmdbPageCache {
    env: Env,
    db: Database<Str, Bytes>,
    stats: RwLock<CacheStats>,
}

impl LmdbPageCache {
    /// Open (or create) a cache under `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the LMDB
    /// environment or database cannot be opened.
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let db: Database<Str, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            db,
            stats: RwLock::new(CacheStats::default()),
        })
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

    fn encode(page: &CachedPage) -> Result<Vec<u8>, LmdbCacheError> {
        let body = StoredPage {
            content: page.content.clone(),
            entry_count: page.entry_count,
            generation: page.generation,
        };
        let value_bytes =
            serde_json::to_vec(&body).map_err(|e| LmdbCacheError::Serialization(e.to_string()))?;

        let mut full_bytes = Vec::with_capacity(8 + value_bytes.len());
        full_bytes.extend_from_slice(&page.cached_at.timestamp_millis().to_le_bytes());
        full_bytes.extend_from_slice(&value_bytes);
        Ok(full_bytes)
    }

    fn decode(page_id: &str, bytes: &[u8]) -> Result<CachedPage, LmdbCacheError> {
        if bytes.len() < 8 {
            return Err(LmdbCacheError::Deserialization(format!(
                "value for {} is truncated",
                page_id
            )));
        }
        let timestamp_bytes: [u8; 8] = bytes[0..8]
            .try_into()
            .map_err(|_| LmdbCacheError::Deserialization("Invalid timestamp".into()))?;
        let cached_at = DateTime::from_timestamp_millis(i64::from_le_bytes(timestamp_bytes))
            .unwrap_or_else(Utc::now);

        let body: StoredPage = serde_json::from_slice(&bytes[8..])
            .map_err(|e| LmdbCacheError::Deserialization(e.to_string()))?;

        Ok(CachedPage {
            page_id: page_id.to_string(),
            content: body.content,
            entry_count: body.entry_count,
            cached_at,
            generation: body.generation,
        })
    }

    fn entry_count(&self) -> Result<u64, LmdbCacheError> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        self.db
            .len(&rtxn)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))
    }
}

#[async_trait]
impl PageCache for LmdbPageCache {
    async fn get(&self, page_id: &str) -> ContentResult<Option<CachedPage>> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        match self.db.get(&rtxn, page_id) {
            Ok(Some(bytes)) => {
                self.record(true);
                Ok(Some(Self::decode(page_id, bytes)?))
            }
            Ok(None) => {
                self.record(false);
                Ok(None)
            }
            Err(e) => {
                self.record(false);
                Err(LmdbCacheError::Transaction(e.to_string()).into())
            }
        }
    }

    async fn put(&self, page: &CachedPage) -> ContentResult<()> {
        let full_bytes = Self::encode(page)?;

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        self.db
            .put(&mut wtxn, &page.page_id, &full_bytes)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        if let Ok(mut stats) = self.stats.write() {
            stats.bytes_written += full_bytes.len() as u64;
        }
        Ok(())
    }

    async fn remove(&self, page_id: &str) -> ContentResult<bool> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let deleted = self
            .db
            .delete(&mut wtxn, page_id)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(deleted)
    }

    async fn keys(&self) -> ContentResult<Vec<String>> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let iter = self
            .db
            .iter(&rtxn)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let mut keys = Vec::new();
        for result in iter {
            let (key, _) = result.map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
            keys.push(key.to_string());
        }
        Ok(keys)
    }

    async fn clear(&self) -> ContentResult<u64> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let removed = self
            .db
            .len(&wtxn)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        self.db
            .clear(&mut wtxn)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(removed)
    }

    async fn flush(&self) -> ContentResult<()> {
        self.env
            .force_sync()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        Ok(())
    }

    async fn stats(&self) -> ContentResult<CacheStats> {
        let mut stats = self
            .stats
            .read()
            .map(|s| s.clone())
            .unwrap_or_default();
        stats.entry_count = self.entry_count()?;
        Ok(stats)
    }
}
