//! Content service: page assembly, edit application, and cache maintenance.
//!
//! The service owns no global state. It is handed a backing store, an
//! optional page cache, and the content configuration, and every operation
//! is an independent async call that may run concurrently with others.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use vitrine_core::{
    flatten, index_over_limit, parse_key, strip_scope_prefix, ApplyOutcome, ContentConfig, ContentError,
    ContentResult, ContentTree, EditFlags, EntryRef, EntryWrite, FlatEntry, LocalizedText,
    NamespaceResolver, Scope, Timestamp, TreeBuilder, ValidationError, WriteBatch,
};

use crate::cache::{CachedPage, PageCache, WriteGeneration};
use crate::store::TextStore;

// ============================================================================
// RESULT TYPES
// ============================================================================

/// Where an assembled page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSource {
    Cache,
    Store,
}

impl ContentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentSource::Cache => "cache",
            ContentSource::Store => "store",
        }
    }
}

/// A page tree with provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembledPage {
    pub page_id: String,
    pub content: ContentTree,
    pub source: ContentSource,
    pub entry_count: usize,
    pub assembled_at: Timestamp,
}

/// One submitted edit, as sent by the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditRequest {
    /// Edits without text are ignored.
    pub new_text: Option<String>,
    pub is_shared: bool,
    pub target_page: Option<String>,
}

impl EditRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            new_text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn shared(mut self) -> Self {
        self.is_shared = true;
        self
    }

    pub fn for_page(mut self, page: impl Into<String>) -> Self {
        self.target_page = Some(page.into());
        self
    }

    fn flags(&self) -> EditFlags {
        EditFlags {
            is_shared: self.is_shared,
            target_page: self.target_page.clone(),
        }
    }
}

/// Where one edit was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResult {
    pub edit_key: String,
    pub scope: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditReport {
    pub applied_count: usize,
    pub skipped: usize,
    pub results: Vec<EditResult>,
    /// False if the store committed but clearing the cache failed.
    pub cache_invalidated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub cleared: u64,
    pub pages_cached: usize,
    pub entries_scanned: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeReport {
    /// Legacy rows moved to their canonical key.
    pub rewritten: usize,
    /// Legacy rows deleted because a newer canonical row existed.
    pub dropped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub scope: String,
    pub imported_count: usize,
}

// ============================================================================
// ASSEMBLY
// ============================================================================

/// Fold result for one page.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub content: ContentTree,
    pub applied: usize,
    pub conflicts: usize,
}

/// Build the tree for `page_id` from its rows and the shared rows.
///
/// Rows are folded shared first, then page, each by `updated_at` then key,
/// so a page leaf overrides a shared leaf at the same path and the result
/// does not depend on fetch order.
pub fn assemble_page(
    page_id: &str,
    mut entries: Vec<FlatEntry>,
    locale: &str,
    config: &ContentConfig,
) -> Assembly {
    entries.sort_by(|a, b| {
        a.scope
            .cmp(&b.scope)
            .then(a.updated_at.cmp(&b.updated_at))
            .then_with(|| a.key.cmp(&b.key))
    });

    let resolver = NamespaceResolver::new(config.unprefixed_keys);
    let mut builder = TreeBuilder::new().with_max_array_index(config.max_array_index);
    let mut applied = 0;
    let mut conflicts = 0;

    for entry in &entries {
        let Some(tree_key) = resolver.resolve_read(page_id, &entry.scope, &entry.key) else {
            continue;
        };
        let Some(text) = entry.value.resolve(locale, &config.default_locale) else {
            debug!(scope = %entry.scope, key = %entry.key, locale, "No text for locale");
            continue;
        };

        match builder.apply(&parse_key(tree_key), Value::String(text.to_string())) {
            ApplyOutcome::Applied => applied += 1,
            ApplyOutcome::Skipped => {}
            ApplyOutcome::Conflict => {
                conflicts += 1;
                debug!(scope = %entry.scope, key = %entry.key, "Entry shadowed by a container");
            }
            ApplyOutcome::IndexTooLarge { index } => {
                warn!(scope = %entry.scope, key = %entry.key, index, "Array index over limit");
            }
        }
    }

    Assembly {
        content: builder.into_value(),
        applied,
        conflicts,
    }
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct ContentService {
    store: Arc<dyn TextStore>,
    cache: Option<Arc<dyn PageCache>>,
    config: ContentConfig,
    resolver: NamespaceResolver,
    generation: WriteGeneration,
}

impl ContentService {
    pub fn new(store: Arc<dyn TextStore>, config: ContentConfig) -> Self {
        Self {
            store,
            cache: None,
            resolver: NamespaceResolver::new(config.unprefixed_keys),
            config,
            generation: WriteGeneration::new(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn PageCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &ContentConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&Arc<dyn PageCache>> {
        self.cache.as_ref()
    }

    pub fn store(&self) -> &Arc<dyn TextStore> {
        &self.store
    }

    /// Current write generation.
    pub fn generation(&self) -> u64 {
        self.generation.current()
    }

    /// Nested content for `page_id`, merged with shared content.
    ///
    /// `locale` defaults to the configured locale; only default-locale trees
    /// are cached.
    #[tracing::instrument(skip_all, fields(page_id = %page_id, locale = ?locale))]
    pub async fn get_page_content(
        &self,
        page_id: &str,
        locale: Option<&str>,
    ) -> ContentResult<AssembledPage> {
        if page_id.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "page_id".to_string(),
            }
            .into());
        }

        let locale = locale
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.config.default_locale);
        let cache = self
            .cache
            .as_ref()
            .filter(|_| locale == self.config.default_locale);

        if let Some(cache) = cache {
            match cache.get(page_id).await {
                Ok(Some(page)) => {
                    debug!(generation = page.generation, "Cache hit");
                    return Ok(AssembledPage {
                        page_id: page.page_id,
                        content: page.content,
                        source: ContentSource::Cache,
                        entry_count: page.entry_count,
                        assembled_at: page.cached_at,
                    });
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Cache read failed, falling back to store"),
            }
        }

        let observed = self.generation.current();
        let entries = self
            .store
            .fetch_scopes(&[Scope::Shared, Scope::page(page_id)])
            .await?;
        if entries.is_empty() {
            return Err(ContentError::page_not_found(page_id));
        }

        let entry_count = entries.len();
        let assembly = assemble_page(page_id, entries, locale, &self.config);
        debug!(
            entry_count,
            applied = assembly.applied,
            conflicts = assembly.conflicts,
            "Assembled page from store"
        );
        if assembly.applied == 0 {
            return Err(ContentError::page_not_found(page_id));
        }

        if let Some(cache) = cache {
            let page = CachedPage::new(page_id, assembly.content.clone(), entry_count, observed);
            self.cache_if_current(cache, &page).await;
        }

        Ok(AssembledPage {
            page_id: page_id.to_string(),
            content: assembly.content,
            source: ContentSource::Store,
            entry_count,
            assembled_at: Utc::now(),
        })
    }

    /// Store every edit that carries text, in one transaction, then clear
    /// the cache.
    ///
    /// Fails without writing anything if any key addresses an array index
    /// above the configured limit.
    #[tracing::instrument(skip_all, fields(page_id = %page_id, edit_count = edits.len()))]
    pub async fn apply_edits(
        &self,
        page_id: &str,
        edits: &BTreeMap<String, EditRequest>,
    ) -> ContentResult<EditReport> {
        if page_id.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "page_id".to_string(),
            }
            .into());
        }

        let mut batch = WriteBatch::new();
        let mut results = Vec::new();
        let mut skipped = 0;

        for (edit_key, edit) in edits {
            let Some(text) = edit.new_text.as_ref() else {
                skipped += 1;
                continue;
            };
            let target = self.resolver.resolve_write(page_id, edit_key, &edit.flags());
            if target.key.is_empty() {
                warn!(edit_key = %edit_key, "Edit resolves to an empty key");
                skipped += 1;
                continue;
            }
            self.check_indices(edit_key, &target.key)?;

            results.push(EditResult {
                edit_key: edit_key.clone(),
                scope: target.scope.to_string(),
                key: target.key.clone(),
            });
            batch = batch.upsert(EntryWrite::new(
                target.scope,
                target.key,
                LocalizedText::single(self.config.default_locale.clone(), text.clone()),
            ));
        }

        if batch.is_empty() {
            return Ok(EditReport {
                applied_count: 0,
                skipped,
                results,
                cache_invalidated: false,
            });
        }

        self.store.write_batch(&batch).await?;
        let cache_invalidated = self.invalidate().await;

        info!(
            applied = results.len(),
            skipped,
            cache_invalidated,
            "Applied edits"
        );

        Ok(EditReport {
            applied_count: results.len(),
            skipped,
            results,
            cache_invalidated,
        })
    }

    /// Clear the cache and rebuild it for every page in the store.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_cache(&self) -> ContentResult<RefreshReport> {
        let Some(cache) = self.cache.as_ref() else {
            return Ok(RefreshReport::default());
        };

        let cleared = {
            let guard = self.generation.lock().await;
            guard.bump();
            cache.clear().await?
        };

        let observed = self.generation.current();
        let entries = self.store.fetch_all().await?;
        let entries_scanned = entries.len();

        let mut shared = Vec::new();
        let mut pages: BTreeMap<String, Vec<FlatEntry>> = BTreeMap::new();
        for entry in entries {
            match &entry.scope {
                Scope::Shared => shared.push(entry),
                Scope::Page(id) => pages.entry(id.clone()).or_default().push(entry),
            }
        }

        let mut pages_cached = 0;
        for (page_id, mut rows) in pages {
            rows.extend(shared.iter().cloned());
            let entry_count = rows.len();
            let assembly = assemble_page(&page_id, rows, &self.config.default_locale, &self.config);
            if assembly.applied == 0 {
                continue;
            }
            let page = CachedPage::new(page_id, assembly.content, entry_count, observed);
            if self.cache_if_current(cache, &page).await {
                pages_cached += 1;
            }
        }

        cache.flush().await?;
        info!(cleared, pages_cached, entries_scanned, "Cache refreshed");

        Ok(RefreshReport {
            cleared,
            pages_cached,
            entries_scanned,
        })
    }

    /// Move rows whose key repeats their own scope (`home` / `home.hero`)
    /// to the canonical unprefixed key.
    ///
    /// When the canonical row already exists the newer `updated_at` wins.
    #[tracing::instrument(skip(self))]
    pub async fn normalize_legacy_keys(&self) -> ContentResult<NormalizeReport> {
        let entries = self.store.fetch_all().await?;
        let by_ref: HashMap<EntryRef, &FlatEntry> =
            entries.iter().map(|entry| (entry.entry_ref(), entry)).collect();

        let mut batch = WriteBatch::new();
        let mut report = NormalizeReport::default();

        for entry in &entries {
            let Some(canonical) = strip_scope_prefix(&entry.key, entry.scope.as_str()) else {
                continue;
            };
            if canonical.is_empty() {
                continue;
            }

            let canonical_ref = EntryRef::new(entry.scope.clone(), canonical);
            let twin_is_newer = by_ref
                .get(&canonical_ref)
                .is_some_and(|twin| twin.updated_at >= entry.updated_at);

            batch = batch.delete(entry.entry_ref());
            if twin_is_newer {
                report.dropped += 1;
            } else {
                batch = batch.upsert(EntryWrite::new(
                    entry.scope.clone(),
                    canonical,
                    entry.value.clone(),
                ));
                report.rewritten += 1;
            }
        }

        if batch.is_empty() {
            return Ok(report);
        }

        self.store.write_batch(&batch).await?;
        self.invalidate().await;
        info!(
            rewritten = report.rewritten,
            dropped = report.dropped,
            "Normalized legacy keys"
        );
        Ok(report)
    }

    /// Flatten `tree` and store every leaf under `scope` in one batch.
    #[tracing::instrument(skip_all, fields(scope = %scope))]
    pub async fn import_tree(&self, scope: Scope, tree: &Value) -> ContentResult<ImportReport> {
        if !tree.is_object() {
            return Err(ValidationError::InvalidValue {
                field: "tree".to_string(),
                reason: "expected a JSON object".to_string(),
            }
            .into());
        }
        if scope.as_str().trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "scope".to_string(),
            }
            .into());
        }

        let mut batch = WriteBatch::new();
        for (key, text) in flatten(tree) {
            self.check_indices(&key, &key)?;
            batch = batch.upsert(EntryWrite::new(
                scope.clone(),
                key,
                LocalizedText::single(self.config.default_locale.clone(), text),
            ));
        }
        let imported_count = batch.upserts.len();

        if !batch.is_empty() {
            self.store.write_batch(&batch).await?;
            self.invalidate().await;
        }
        info!(imported_count, "Imported content tree");

        Ok(ImportReport {
            scope: scope.to_string(),
            imported_count,
        })
    }

    /// Page ids that own at least one row.
    pub async fn list_pages(&self) -> ContentResult<Vec<String>> {
        let scopes = self.store.list_scopes().await?;
        let mut pages: Vec<String> = scopes
            .into_iter()
            .filter_map(|scope| scope.page_id().map(str::to_string))
            .collect();
        pages.sort();
        pages.dedup();
        Ok(pages)
    }

    pub async fn health_check(&self) -> ContentResult<()> {
        self.store.health_check().await
    }

    /// Reject keys the read path would drop for exceeding the index limit.
    fn check_indices(&self, field: &str, key: &str) -> ContentResult<()> {
        match index_over_limit(&parse_key(key), self.config.max_array_index) {
            Some(index) => Err(ValidationError::InvalidValue {
                field: field.to_string(),
                reason: format!(
                    "array index {} exceeds the limit of {}",
                    index, self.config.max_array_index
                ),
            }
            .into()),
            None => Ok(()),
        }
    }

    /// Bump the generation and clear the cache. Returns false if clearing
    /// failed; the write itself is already committed.
    async fn invalidate(&self) -> bool {
        let Some(cache) = self.cache.as_ref() else {
            return true;
        };
        let guard = self.generation.lock().await;
        let generation = guard.bump();
        match cache.clear().await {
            Ok(removed) => {
                debug!(generation, removed, "Cache invalidated");
                true
            }
            Err(e) => {
                warn!(generation, error = %e, "Cache invalidation failed");
                false
            }
        }
    }

    /// Store `page` unless a write committed after its rows were fetched.
    async fn cache_if_current(&self, cache: &Arc<dyn PageCache>, page: &CachedPage) -> bool {
        let guard = self.generation.lock().await;
        if !guard.is_current(page.generation) {
            debug!(page_id = %page.page_id, "Skipping cache fill after concurrent write");
            return false;
        }
        match cache.put(page).await {
            Ok(()) => true,
            Err(e) => {
                warn!(page_id = %page.page_id, error = %e, "Cache write failed");
                false
            }
        }
    }
}
