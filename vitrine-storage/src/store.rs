//! Backing store abstraction for flat text entries.
//!
//! The production implementation lives in vitrine-api (PostgreSQL). This
//! module provides the trait and an in-memory store used by tests and by
//! deployments that seed content at startup.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use vitrine_core::{ContentResult, EntryRef, FlatEntry, Scope, StoreError, WriteBatch};

/// Durable store of flat entries, unique on `(scope, key)`.
#[async_trait]
pub trait TextStore: Send + Sync {
    /// All entries whose scope is one of `scopes`.
    async fn fetch_scopes(&self, scopes: &[Scope]) -> ContentResult<Vec<FlatEntry>>;

    /// Every stored entry.
    async fn fetch_all(&self) -> ContentResult<Vec<FlatEntry>>;

    /// Distinct scopes that hold at least one entry.
    async fn list_scopes(&self) -> ContentResult<Vec<Scope>>;

    /// Apply deletes then upserts in one transaction. Either every row of
    /// the batch is committed or none is.
    ///
    /// Upserts keep an existing row's `created_at` and stamp `updated_at`.
    /// Returns the number of rows written or removed.
    async fn write_batch(&self, batch: &WriteBatch) -> ContentResult<usize>;

    async fn health_check(&self) -> ContentResult<()>;
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// In-memory store for tests.
#[derive(Debug, Default)]
pub struct InMemoryTextStore {
    rows: RwLock<BTreeMap<EntryRef, FlatEntry>>,
    fail_writes: AtomicBool,
}

impl InMemoryTextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store preloaded with `entries`, timestamps untouched.
    pub fn with_entries(entries: impl IntoIterator<Item = FlatEntry>) -> Self {
        let store = Self::new();
        for entry in entries {
            store.insert(entry);
        }
        store
    }

    /// Insert a row as is. Bypasses timestamp stamping.
    pub fn insert(&self, entry: FlatEntry) {
        if let Ok(mut rows) = self.rows.write() {
            rows.insert(entry.entry_ref(), entry);
        }
    }

    pub fn get(&self, entry: &EntryRef) -> Option<FlatEntry> {
        self.rows.read().ok()?.get(entry).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every subsequent `write_batch` fail without touching any row.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TextStore for InMemoryTextStore {
    async fn fetch_scopes(&self, scopes: &[Scope]) -> ContentResult<Vec<FlatEntry>> {
        let rows = self.rows.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(rows
            .values()
            .filter(|entry| scopes.contains(&entry.scope))
            .cloned()
            .collect())
    }

    async fn fetch_all(&self) -> ContentResult<Vec<FlatEntry>> {
        let rows = self.rows.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(rows.values().cloned().collect())
    }

    async fn list_scopes(&self) -> ContentResult<Vec<Scope>> {
        let rows = self.rows.read().map_err(|_| StoreError::LockPoisoned)?;
        let scopes: BTreeSet<Scope> = rows.keys().map(|entry| entry.scope.clone()).collect();
        Ok(scopes.into_iter().collect())
    }

    async fn write_batch(&self, batch: &WriteBatch) -> ContentResult<usize> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::TransactionFailed {
                reason: "writes disabled".to_string(),
            }
            .into());
        }

        let mut rows = self.rows.write().map_err(|_| StoreError::LockPoisoned)?;
        let now = Utc::now();
        let mut touched = 0;

        for entry in &batch.deletes {
            if rows.remove(entry).is_some() {
                touched += 1;
            }
        }
        for write in &batch.upserts {
            let id = write.entry_ref();
            let created_at = rows.get(&id).map(|row| row.created_at).unwrap_or(now);
            rows.insert(
                id,
                FlatEntry {
                    scope: write.scope.clone(),
                    key: write.key.clone(),
                    value: write.value.clone(),
                    created_at,
                    updated_at: now,
                },
            );
            touched += 1;
        }

        Ok(touched)
    }

    async fn health_check(&self) -> ContentResult<()> {
        self.rows.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::{EntryWrite, LocalizedText};

    fn write(scope: Scope, key: &str, text: &str) -> EntryWrite {
        EntryWrite::new(scope, key, LocalizedText::single("pt-BR", text))
    }

    #[tokio::test]
    async fn test_upsert_is_unique_on_scope_and_key() {
        let store = InMemoryTextStore::new();
        let batch = WriteBatch::new()
            .upsert(write(Scope::page("home"), "hero.title", "A"))
            .upsert(write(Scope::Shared, "hero.title", "B"));
        assert_eq!(store.write_batch(&batch).await.expect("write should succeed"), 2);

        let again = WriteBatch::new().upsert(write(Scope::page("home"), "hero.title", "C"));
        store.write_batch(&again).await.expect("write should succeed");
        assert_eq!(store.len(), 2);

        let row = store
            .get(&EntryRef::new(Scope::page("home"), "hero.title"))
            .expect("row should exist");
        assert_eq!(row.value, LocalizedText::single("pt-BR", "C"));
        assert!(row.updated_at >= row.created_at);
    }

    #[tokio::test]
    async fn test_fetch_scopes_filters() {
        let store = InMemoryTextStore::new();
        let batch = WriteBatch::new()
            .upsert(write(Scope::page("home"), "a", "1"))
            .upsert(write(Scope::page("about"), "b", "2"))
            .upsert(write(Scope::Shared, "c", "3"));
        store.write_batch(&batch).await.expect("write should succeed");

        let rows = store
            .fetch_scopes(&[Scope::page("home"), Scope::Shared])
            .await
            .expect("fetch should succeed");
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.scope != Scope::page("about")));

        let scopes = store.list_scopes().await.expect("list should succeed");
        assert_eq!(scopes[0], Scope::Shared);
        assert_eq!(scopes.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_batch_writes_nothing() {
        let store = InMemoryTextStore::new();
        store.set_fail_writes(true);
        let batch = WriteBatch::new().upsert(write(Scope::page("home"), "a", "1"));
        let err = store.write_batch(&batch).await.expect_err("write should fail");
        assert!(matches!(
            err,
            vitrine_core::ContentError::Store(StoreError::TransactionFailed { .. })
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_then_upsert() {
        let store = InMemoryTextStore::new();
        store
            .write_batch(&WriteBatch::new().upsert(write(Scope::page("home"), "home.a", "old")))
            .await
            .expect("write should succeed");

        let batch = WriteBatch::new()
            .delete(EntryRef::new(Scope::page("home"), "home.a"))
            .upsert(write(Scope::page("home"), "a", "old"));
        assert_eq!(store.write_batch(&batch).await.expect("write should succeed"), 2);
        assert!(store.get(&EntryRef::new(Scope::page("home"), "home.a")).is_none());
        assert!(store.get(&EntryRef::new(Scope::page("home"), "a")).is_some());
    }
}
