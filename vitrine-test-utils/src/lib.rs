//! VITRINE Test Utilities
//!
//! Shared test infrastructure for the VITRINE workspace:
//! - Proptest generators for keys, entries, and content trees
//! - Fixtures for the reference pages used across suites
//! - Assertions on content results

pub use vitrine_core::{
    ContentConfig, ContentError, ContentResult, EntryRef, FlatEntry, LocalizedText, Scope,
    Timestamp, UnprefixedKeyPolicy, DEFAULT_LOCALE, SHARED_SCOPE,
};

use chrono::Utc;

/// Entry with a single default-locale value.
pub fn text_entry(scope: Scope, key: &str, text: &str) -> FlatEntry {
    FlatEntry::new(scope, key, LocalizedText::single(DEFAULT_LOCALE, text))
}

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for flat keys and entries.

    use super::*;
    use proptest::prelude::*;

    /// A field name from a small alphabet so generated keys collide often.
    pub fn arb_field_name() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("hero".to_string()),
            Just("title".to_string()),
            Just("items".to_string()),
            Just("cta".to_string()),
            "[a-d]{1,3}",
        ]
    }

    /// One key segment, plain or indexed.
    pub fn arb_segment(max_index: usize) -> impl Strategy<Value = String> {
        prop_oneof![
            3 => arb_field_name(),
            1 => (arb_field_name(), 0..=max_index)
                .prop_map(|(name, index)| format!("{}[{}]", name, index)),
        ]
    }

    /// A dotted key of 1..=depth segments.
    pub fn arb_key(depth: usize) -> impl Strategy<Value = String> {
        prop::collection::vec(arb_segment(4), 1..=depth).prop_map(|segments| segments.join("."))
    }

    /// Page or shared scope over a fixed set of pages.
    pub fn arb_scope() -> impl Strategy<Value = Scope> {
        prop_oneof![
            Just(Scope::Shared),
            Just(Scope::page("home")),
            Just(Scope::page("tratamentos")),
        ]
    }

    /// Generate a Timestamp (DateTime<Utc>).
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        // 2020-2030
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    pub fn arb_text() -> impl Strategy<Value = String> {
        "[A-Za-zÀ-ú0-9 ]{0,24}"
    }

    /// A stored entry with distinct timestamps.
    pub fn arb_entry(scope: impl Strategy<Value = Scope>) -> impl Strategy<Value = FlatEntry> {
        (scope, arb_key(3), arb_text(), arb_timestamp()).prop_map(|(scope, key, text, at)| {
            FlatEntry {
                scope,
                key,
                value: LocalizedText::single(DEFAULT_LOCALE, text),
                created_at: at,
                updated_at: at,
            }
        })
    }

    /// Entries for one page plus shared rows, unique on `(scope, key)`.
    pub fn arb_page_rows(page_id: &'static str, max: usize) -> impl Strategy<Value = Vec<FlatEntry>> {
        let scope = prop_oneof![Just(Scope::Shared), Just(Scope::page(page_id))];
        prop::collection::vec(arb_entry(scope), 0..max).prop_map(|rows| {
            let mut seen = std::collections::BTreeSet::new();
            rows.into_iter()
                .filter(|row| seen.insert(row.entry_ref()))
                .collect()
        })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built rows for common scenarios.

    use super::*;

    /// `tratamentos` page rows plus the shared footer.
    pub fn tratamentos_rows() -> Vec<FlatEntry> {
        vec![
            text_entry(Scope::page("tratamentos"), "treatments[0].title", "Psicoterapia"),
            text_entry(Scope::Shared, "footer.copyright", "© 2025"),
        ]
    }

    /// A home page with legacy prefixed rows mixed in.
    pub fn home_rows_with_legacy_keys() -> Vec<FlatEntry> {
        vec![
            text_entry(Scope::page("home"), "hero.title", "Bem-vindo"),
            text_entry(Scope::page("home"), "home.hero.subtitle", "Cuidado integral"),
            text_entry(Scope::page("home"), "cards[1].label", "Agende"),
            text_entry(Scope::Shared, "footer.copyright", "© 2025"),
            text_entry(Scope::Shared, "nav[0].label", "Início"),
        ]
    }

    /// Content config with the page policy for unprefixed edit keys.
    pub fn page_policy_config() -> ContentConfig {
        ContentConfig::default().with_unprefixed_keys(UnprefixedKeyPolicy::Page)
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on content results.

    use super::*;

    /// Assert that a ContentResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &ContentResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a ContentResult is a PageNotFound error for `page_id`.
    #[track_caller]
    pub fn assert_page_not_found<T: std::fmt::Debug>(result: &ContentResult<T>, page_id: &str) {
        match result {
            Err(ContentError::PageNotFound { page_id: id }) if id == page_id => {}
            other => panic!("Expected PageNotFound({}), got: {:?}", page_id, other),
        }
    }

    /// Assert that a ContentResult is a backing store error.
    #[track_caller]
    pub fn assert_store_error<T: std::fmt::Debug>(result: &ContentResult<T>) {
        match result {
            Err(ContentError::Store(_)) => {}
            other => panic!("Expected Store error, got: {:?}", other),
        }
    }

    /// Assert the value at a JSON pointer (`/treatments/0/title`).
    #[track_caller]
    pub fn assert_text_at(tree: &serde_json::Value, pointer: &str, expected: &str) {
        match tree.pointer(pointer) {
            Some(serde_json::Value::String(text)) => assert_eq!(text, expected, "at {}", pointer),
            other => panic!("Expected text {:?} at {}, got: {:?}", expected, pointer, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fixtures_use_default_locale() {
        for row in fixtures::tratamentos_rows() {
            assert!(row.value.resolve(DEFAULT_LOCALE, DEFAULT_LOCALE).is_some());
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_page_rows_are_unique(rows in generators::arb_page_rows("home", 20)) {
            let refs: std::collections::BTreeSet<EntryRef> =
                rows.iter().map(FlatEntry::entry_ref).collect();
            prop_assert_eq!(refs.len(), rows.len());
        }
    }
}
