//! Read path, write path, and cache behaviour of the content service.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;
use vitrine_core::{
    CacheError, ContentConfig, ContentError, ContentResult, EntryRef, FlatEntry, LocalizedText,
    Scope, UnprefixedKeyPolicy, ValidationError, WriteBatch,
};
use vitrine_storage::{
    CacheStats, CachedPage, ContentService, ContentSource, EditRequest, InMemoryPageCache,
    InMemoryTextStore, PageCache, TextStore,
};
use vitrine_test_utils::assertions::{assert_page_not_found, assert_store_error, assert_text_at};
use vitrine_test_utils::fixtures::{home_rows_with_legacy_keys, tratamentos_rows};
use vitrine_test_utils::text_entry;

struct Harness {
    store: Arc<InMemoryTextStore>,
    cache: Arc<InMemoryPageCache>,
    service: ContentService,
}

fn harness(rows: Vec<FlatEntry>) -> Harness {
    harness_with_config(rows, ContentConfig::default())
}

fn harness_with_config(rows: Vec<FlatEntry>, config: ContentConfig) -> Harness {
    let store = Arc::new(InMemoryTextStore::with_entries(rows));
    let cache = Arc::new(InMemoryPageCache::new());
    let service = ContentService::new(store.clone(), config).with_cache(cache.clone());
    Harness {
        store,
        cache,
        service,
    }
}

fn edits(pairs: &[(&str, EditRequest)]) -> BTreeMap<String, EditRequest> {
    pairs
        .iter()
        .map(|(key, edit)| (key.to_string(), edit.clone()))
        .collect()
}

// ============================================================================
// READ PATH
// ============================================================================

#[tokio::test]
async fn test_page_merges_shared_content() -> ContentResult<()> {
    let h = harness(tratamentos_rows());

    let page = h.service.get_page_content("tratamentos", None).await?;
    assert_eq!(
        page.content,
        json!({
            "treatments": [{"title": "Psicoterapia"}],
            "footer": {"copyright": "© 2025"}
        })
    );
    assert_eq!(page.source, ContentSource::Store);
    assert_eq!(page.entry_count, 2);
    Ok(())
}

#[tokio::test]
async fn test_second_read_is_served_from_cache() -> ContentResult<()> {
    let h = harness(tratamentos_rows());

    let first = h.service.get_page_content("tratamentos", None).await?;
    let second = h.service.get_page_content("tratamentos", None).await?;

    assert_eq!(second.source, ContentSource::Cache);
    assert_eq!(second.content, first.content);
    assert_eq!(second.entry_count, first.entry_count);
    Ok(())
}

#[tokio::test]
async fn test_unknown_page_with_no_shared_rows_is_not_found() {
    let h = harness(vec![]);
    let result = h.service.get_page_content("nowhere", None).await;
    assert_page_not_found(&result, "nowhere");
}

#[tokio::test]
async fn test_unknown_page_still_sees_shared_rows() -> ContentResult<()> {
    let h = harness(tratamentos_rows());
    let page = h.service.get_page_content("contato", None).await?;
    assert_eq!(page.content, json!({"footer": {"copyright": "© 2025"}}));
    Ok(())
}

#[tokio::test]
async fn test_legacy_prefixed_rows_are_read_canonically() -> ContentResult<()> {
    let h = harness(home_rows_with_legacy_keys());
    let page = h.service.get_page_content("home", None).await?;

    assert_text_at(&page.content, "/hero/title", "Bem-vindo");
    assert_text_at(&page.content, "/hero/subtitle", "Cuidado integral");
    assert_text_at(&page.content, "/cards/1/label", "Agende");
    assert_eq!(page.content["cards"][0], json!({}));
    assert_text_at(&page.content, "/nav/0/label", "Início");
    Ok(())
}

#[tokio::test]
async fn test_other_locale_bypasses_cache() -> ContentResult<()> {
    let mut values = BTreeMap::new();
    values.insert("pt-BR".to_string(), "Olá".to_string());
    values.insert("en".to_string(), "Hello".to_string());
    let h = harness(vec![FlatEntry::new(
        Scope::page("home"),
        "greeting",
        LocalizedText::Localized(values),
    )]);

    let english = h.service.get_page_content("home", Some("en")).await?;
    assert_eq!(english.content, json!({"greeting": "Hello"}));
    assert_eq!(english.source, ContentSource::Store);
    assert!(h.cache.keys().await?.is_empty());

    let again = h.service.get_page_content("home", Some("en")).await?;
    assert_eq!(again.source, ContentSource::Store);

    let default = h.service.get_page_content("home", None).await?;
    assert_eq!(default.content, json!({"greeting": "Olá"}));
    assert_eq!(h.cache.keys().await?, vec!["home".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_service_without_cache_reads_store() -> ContentResult<()> {
    let store = Arc::new(InMemoryTextStore::with_entries(tratamentos_rows()));
    let service = ContentService::new(store, ContentConfig::default());

    service.get_page_content("tratamentos", None).await?;
    let page = service.get_page_content("tratamentos", None).await?;
    assert_eq!(page.source, ContentSource::Store);

    let refresh = service.refresh_cache().await?;
    assert_eq!(refresh.pages_cached, 0);
    Ok(())
}

#[tokio::test]
async fn test_rows_without_readable_text_are_not_found() {
    let mut values = BTreeMap::new();
    values.insert("en".to_string(), "Hi".to_string());
    let h = harness(vec![FlatEntry::new(
        Scope::page("home"),
        "greeting",
        LocalizedText::Localized(values),
    )]);

    let result = h.service.get_page_content("home", None).await;
    assert_page_not_found(&result, "home");
    assert!(h.cache.keys().await.expect("keys should succeed").is_empty());
}

// ============================================================================
// WRITE PATH
// ============================================================================

#[tokio::test]
async fn test_page_edit_round_trip() -> ContentResult<()> {
    let h = harness(tratamentos_rows());

    let report = h
        .service
        .apply_edits(
            "tratamentos",
            &edits(&[("treatments[0].details", EditRequest::text("X"))]),
        )
        .await?;
    assert_eq!(report.applied_count, 1);
    assert_eq!(report.skipped, 0);
    assert!(report.cache_invalidated);
    assert_eq!(report.results[0].scope, "tratamentos");
    assert_eq!(report.results[0].key, "treatments[0].details");

    let row = h
        .store
        .get(&EntryRef::new(Scope::page("tratamentos"), "treatments[0].details"))
        .expect("edited row should exist");
    assert_eq!(row.value, LocalizedText::single("pt-BR", "X"));
    assert_eq!(
        serde_json::to_value(&row.value).expect("value should serialize"),
        json!({"pt-BR": "X"})
    );

    let page = h.service.get_page_content("tratamentos", None).await?;
    assert_text_at(&page.content, "/treatments/0/details", "X");
    assert_text_at(&page.content, "/treatments/0/title", "Psicoterapia");
    Ok(())
}

#[tokio::test]
async fn test_shared_edit_is_stored_once_for_every_page() -> ContentResult<()> {
    let h = harness(tratamentos_rows());

    h.service
        .apply_edits(
            "tratamentos",
            &edits(&[("footer.copyright", EditRequest::text("© 2026").shared())]),
        )
        .await?;

    let row = h
        .store
        .get(&EntryRef::new(Scope::Shared, "footer.copyright"))
        .expect("shared row should exist");
    assert_eq!(row.value, LocalizedText::single("pt-BR", "© 2026"));
    assert!(h
        .store
        .get(&EntryRef::new(Scope::page("tratamentos"), "footer.copyright"))
        .is_none());

    let other = h.service.get_page_content("contato", None).await?;
    assert_text_at(&other.content, "/footer/copyright", "© 2026");
    Ok(())
}

#[tokio::test]
async fn test_prefixed_edit_key_is_stored_unprefixed() -> ContentResult<()> {
    let h = harness(tratamentos_rows());
    let report = h
        .service
        .apply_edits(
            "tratamentos",
            &edits(&[("tratamentos.treatments[0].title", EditRequest::text("Terapia"))]),
        )
        .await?;
    assert_eq!(report.results[0].key, "treatments[0].title");

    let page = h.service.get_page_content("tratamentos", None).await?;
    assert_text_at(&page.content, "/treatments/0/title", "Terapia");
    assert_eq!(h.store.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_shared_policy_routes_unprefixed_keys_to_shared() -> ContentResult<()> {
    let config = ContentConfig::default().with_unprefixed_keys(UnprefixedKeyPolicy::Shared);
    let h = harness_with_config(vec![], config);

    let report = h
        .service
        .apply_edits(
            "home",
            &edits(&[
                ("nav[0].label", EditRequest::text("Início")),
                ("home.hero.title", EditRequest::text("Bem-vindo")),
            ]),
        )
        .await?;
    let scopes: BTreeMap<String, String> = report
        .results
        .iter()
        .map(|r| (r.edit_key.clone(), r.scope.clone()))
        .collect();
    assert_eq!(scopes["nav[0].label"], "__shared__");
    assert_eq!(scopes["home.hero.title"], "home");
    Ok(())
}

#[tokio::test]
async fn test_edits_without_text_are_skipped() -> ContentResult<()> {
    let h = harness(tratamentos_rows());
    h.service.get_page_content("tratamentos", None).await?;

    let report = h
        .service
        .apply_edits(
            "tratamentos",
            &edits(&[
                ("hero.title", EditRequest::default()),
                ("hero.subtitle", EditRequest::default().shared()),
            ]),
        )
        .await?;
    assert_eq!(report.applied_count, 0);
    assert_eq!(report.skipped, 2);
    assert!(!report.cache_invalidated);
    assert_eq!(h.store.len(), 2);
    // Nothing written, nothing invalidated.
    assert_eq!(h.cache.keys().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_edit_over_index_limit_is_rejected_before_writing() -> ContentResult<()> {
    let h = harness(tratamentos_rows());

    let result = h
        .service
        .apply_edits(
            "home",
            &edits(&[
                ("hero.title", EditRequest::text("Olá")),
                ("items[2000].label", EditRequest::text("X")),
            ]),
        )
        .await;
    assert!(matches!(
        result,
        Err(ContentError::Validation(ValidationError::InvalidValue { ref field, .. }))
            if field == "items[2000].label"
    ));
    assert_eq!(h.store.len(), 2);
    assert_eq!(h.service.generation(), 0);

    let report = h
        .service
        .apply_edits("home", &edits(&[("items[1024].label", EditRequest::text("X"))]))
        .await?;
    assert_eq!(report.applied_count, 1);
    let page = h.service.get_page_content("home", None).await?;
    assert_text_at(&page.content, "/items/1024/label", "X");
    Ok(())
}

#[tokio::test]
async fn test_repeated_edit_is_idempotent() -> ContentResult<()> {
    let h = harness(tratamentos_rows());
    let batch = edits(&[("treatments[1].title", EditRequest::text("Neuropsicologia"))]);

    h.service.apply_edits("tratamentos", &batch).await?;
    let once = h.service.get_page_content("tratamentos", None).await?;
    h.service.apply_edits("tratamentos", &batch).await?;
    let twice = h.service.get_page_content("tratamentos", None).await?;

    assert_eq!(once.content, twice.content);
    assert_eq!(h.store.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_write_invalidates_whole_cache() -> ContentResult<()> {
    let mut rows = tratamentos_rows();
    rows.push(text_entry(Scope::page("home"), "hero.title", "Bem-vindo"));
    let h = harness(rows);

    h.service.get_page_content("tratamentos", None).await?;
    h.service.get_page_content("home", None).await?;
    assert_eq!(h.cache.keys().await?.len(), 2);
    let before = h.service.generation();

    h.service
        .apply_edits("home", &edits(&[("hero.title", EditRequest::text("Olá"))]))
        .await?;
    assert!(h.cache.keys().await?.is_empty());
    assert_eq!(h.service.generation(), before + 1);

    let page = h.service.get_page_content("home", None).await?;
    assert_eq!(page.source, ContentSource::Store);
    assert_text_at(&page.content, "/hero/title", "Olá");
    Ok(())
}

#[tokio::test]
async fn test_failed_batch_leaves_store_and_cache_untouched() -> ContentResult<()> {
    let h = harness(tratamentos_rows());
    h.service.get_page_content("tratamentos", None).await?;
    h.store.set_fail_writes(true);

    let result = h
        .service
        .apply_edits(
            "tratamentos",
            &edits(&[
                ("treatments[0].title", EditRequest::text("A")),
                ("footer.copyright", EditRequest::text("B").shared()),
            ]),
        )
        .await;
    assert_store_error(&result);

    assert_eq!(h.service.generation(), 0);
    let page = h.service.get_page_content("tratamentos", None).await?;
    assert_eq!(page.source, ContentSource::Cache);
    assert_text_at(&page.content, "/treatments/0/title", "Psicoterapia");
    Ok(())
}

// ============================================================================
// CACHE FAILURES
// ============================================================================

/// Cache whose every call fails.
struct BrokenCache;

fn broken() -> ContentError {
    CacheError::Backend {
        reason: "disk full".to_string(),
    }
    .into()
}

#[async_trait]
impl PageCache for BrokenCache {
    async fn get(&self, _page_id: &str) -> ContentResult<Option<CachedPage>> {
        Err(broken())
    }

    async fn put(&self, _page: &CachedPage) -> ContentResult<()> {
        Err(broken())
    }

    async fn remove(&self, _page_id: &str) -> ContentResult<bool> {
        Err(broken())
    }

    async fn keys(&self) -> ContentResult<Vec<String>> {
        Err(broken())
    }

    async fn clear(&self) -> ContentResult<u64> {
        Err(broken())
    }

    async fn flush(&self) -> ContentResult<()> {
        Err(broken())
    }

    async fn stats(&self) -> ContentResult<CacheStats> {
        Err(broken())
    }
}

fn broken_cache_service(rows: Vec<FlatEntry>) -> (Arc<InMemoryTextStore>, ContentService) {
    let store = Arc::new(InMemoryTextStore::with_entries(rows));
    let service =
        ContentService::new(store.clone(), ContentConfig::default()).with_cache(Arc::new(BrokenCache));
    (store, service)
}

#[tokio::test]
async fn test_read_falls_back_to_store_when_cache_fails() -> ContentResult<()> {
    let (_, service) = broken_cache_service(tratamentos_rows());

    for _ in 0..2 {
        let page = service.get_page_content("tratamentos", None).await?;
        assert_eq!(page.source, ContentSource::Store);
        assert_text_at(&page.content, "/treatments/0/title", "Psicoterapia");
    }
    Ok(())
}

#[tokio::test]
async fn test_write_succeeds_when_cache_clear_fails() -> ContentResult<()> {
    let (store, service) = broken_cache_service(tratamentos_rows());

    let report = service
        .apply_edits(
            "tratamentos",
            &edits(&[("treatments[0].details", EditRequest::text("X"))]),
        )
        .await?;
    assert_eq!(report.applied_count, 1);
    assert!(!report.cache_invalidated);
    assert!(store
        .get(&EntryRef::new(Scope::page("tratamentos"), "treatments[0].details"))
        .is_some());

    let page = service.get_page_content("tratamentos", None).await?;
    assert_text_at(&page.content, "/treatments/0/details", "X");
    Ok(())
}

// ============================================================================
// READ / WRITE RACE
// ============================================================================

/// Store whose scoped reads snapshot the rows, then wait for a signal.
struct GatedStore {
    inner: InMemoryTextStore,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl TextStore for GatedStore {
    async fn fetch_scopes(&self, scopes: &[Scope]) -> ContentResult<Vec<FlatEntry>> {
        let snapshot = self.inner.fetch_scopes(scopes).await?;
        self.entered.notify_one();
        self.release.notified().await;
        Ok(snapshot)
    }

    async fn fetch_all(&self) -> ContentResult<Vec<FlatEntry>> {
        self.inner.fetch_all().await
    }

    async fn list_scopes(&self) -> ContentResult<Vec<Scope>> {
        self.inner.list_scopes().await
    }

    async fn write_batch(&self, batch: &WriteBatch) -> ContentResult<usize> {
        self.inner.write_batch(batch).await
    }

    async fn health_check(&self) -> ContentResult<()> {
        self.inner.health_check().await
    }
}

#[tokio::test]
async fn test_read_overlapping_write_does_not_fill_cache() -> ContentResult<()> {
    let store = Arc::new(GatedStore {
        inner: InMemoryTextStore::with_entries(tratamentos_rows()),
        entered: Notify::new(),
        release: Notify::new(),
    });
    let cache = Arc::new(InMemoryPageCache::new());
    let service = Arc::new(
        ContentService::new(store.clone(), ContentConfig::default()).with_cache(cache.clone()),
    );

    let reader = {
        let service = service.clone();
        tokio::spawn(async move { service.get_page_content("tratamentos", None).await })
    };

    // The reader now holds rows that predate the edit below.
    store.entered.notified().await;
    service
        .apply_edits(
            "tratamentos",
            &edits(&[("treatments[0].title", EditRequest::text("Nova"))]),
        )
        .await?;
    store.release.notify_one();

    let stale = reader.await.expect("reader task should not panic")?;
    assert_text_at(&stale.content, "/treatments/0/title", "Psicoterapia");
    assert!(cache.get("tratamentos").await?.is_none());
    Ok(())
}

// ============================================================================
// MAINTENANCE
// ============================================================================

#[tokio::test]
async fn test_refresh_rebuilds_every_page() -> ContentResult<()> {
    let mut rows = tratamentos_rows();
    rows.push(text_entry(Scope::page("home"), "hero.title", "Bem-vindo"));
    let h = harness(rows);
    h.service.get_page_content("home", None).await?;

    let report = h.service.refresh_cache().await?;
    assert_eq!(report.cleared, 1);
    assert_eq!(report.pages_cached, 2);
    assert_eq!(report.entries_scanned, 3);

    let mut keys = h.cache.keys().await?;
    keys.sort();
    assert_eq!(keys, vec!["home".to_string(), "tratamentos".to_string()]);

    let home = h.service.get_page_content("home", None).await?;
    assert_eq!(home.source, ContentSource::Cache);
    assert_text_at(&home.content, "/footer/copyright", "© 2025");
    assert_eq!(home.entry_count, 2);
    Ok(())
}

#[tokio::test]
async fn test_normalize_rewrites_prefixed_rows() -> ContentResult<()> {
    let h = harness(home_rows_with_legacy_keys());
    let before = h.service.get_page_content("home", None).await?;

    let report = h.service.normalize_legacy_keys().await?;
    assert_eq!(report.rewritten, 1);
    assert_eq!(report.dropped, 0);
    assert!(h
        .store
        .get(&EntryRef::new(Scope::page("home"), "home.hero.subtitle"))
        .is_none());
    assert!(h
        .store
        .get(&EntryRef::new(Scope::page("home"), "hero.subtitle"))
        .is_some());

    let after = h.service.get_page_content("home", None).await?;
    assert_eq!(after.source, ContentSource::Store);
    assert_eq!(after.content, before.content);

    let again = h.service.normalize_legacy_keys().await?;
    assert_eq!((again.rewritten, again.dropped), (0, 0));
    Ok(())
}

#[tokio::test]
async fn test_normalize_keeps_newer_canonical_row() -> ContentResult<()> {
    let now = chrono::Utc::now();
    let h = harness(vec![
        text_entry(Scope::page("home"), "home.hero.title", "legacy")
            .with_updated_at(now - chrono::Duration::days(1)),
        text_entry(Scope::page("home"), "hero.title", "current").with_updated_at(now),
    ]);

    let report = h.service.normalize_legacy_keys().await?;
    assert_eq!((report.rewritten, report.dropped), (0, 1));
    assert_eq!(h.store.len(), 1);

    let page = h.service.get_page_content("home", None).await?;
    assert_text_at(&page.content, "/hero/title", "current");
    Ok(())
}

#[tokio::test]
async fn test_import_then_read_restores_tree() -> ContentResult<()> {
    let h = harness(vec![]);
    let tree = json!({
        "hero": {"title": "Bem-vindo", "cards": [{"label": "A"}, {"label": "B"}]},
        "faq": [{"q": "Q1", "a": "A1"}]
    });

    let report = h.service.import_tree(Scope::page("home"), &tree).await?;
    assert_eq!(report.imported_count, 5);
    assert_eq!(report.scope, "home");

    let page = h.service.get_page_content("home", None).await?;
    assert_eq!(page.content, tree);
    Ok(())
}

#[tokio::test]
async fn test_import_over_index_limit_is_rejected() {
    let config = ContentConfig::default().with_max_array_index(1);
    let h = harness_with_config(vec![], config);
    let tree = json!({"faq": [{"q": "a"}, {"q": "b"}, {"q": "c"}]});

    let result = h.service.import_tree(Scope::page("home"), &tree).await;
    assert!(matches!(result, Err(ContentError::Validation(_))));
    assert_eq!(h.store.len(), 0);
}

#[tokio::test]
async fn test_import_rejects_non_object() {
    let h = harness(vec![]);
    let result = h.service.import_tree(Scope::Shared, &json!(["a"])).await;
    assert!(matches!(result, Err(ContentError::Validation(_))));
}

#[tokio::test]
async fn test_list_pages_excludes_shared() -> ContentResult<()> {
    let h = harness(home_rows_with_legacy_keys());
    let mut rows = tratamentos_rows();
    rows.truncate(1);
    for row in rows {
        h.store.insert(row);
    }

    assert_eq!(
        h.service.list_pages().await?,
        vec!["home".to_string(), "tratamentos".to_string()]
    );
    h.service.health_check().await?;
    Ok(())
}
