//! Stored row types

use std::collections::BTreeMap;
use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Scope value reserved for content common to every page.
pub const SHARED_SCOPE: &str = "__shared__";

/// Locale written by the editor and preferred on reads.
pub const DEFAULT_LOCALE: &str = "pt-BR";

// ============================================================================
// SCOPE
// ============================================================================

/// Owner of a flat entry: one page, or the shared namespace.
///
/// `Shared` orders before every page so a sorted fold applies shared
/// entries first and lets page entries override them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Scope {
    Shared,
    Page(String),
}

impl Scope {
    /// Interpret a stored scope column.
    pub fn parse(raw: &str) -> Self {
        if raw == SHARED_SCOPE {
            Scope::Shared
        } else {
            Scope::Page(raw.to_string())
        }
    }

    pub fn page(page_id: impl Into<String>) -> Self {
        Self::parse(&page_id.into())
    }

    /// The value stored in the scope column.
    pub fn as_str(&self) -> &str {
        match self {
            Scope::Shared => SHARED_SCOPE,
            Scope::Page(id) => id,
        }
    }

    pub fn page_id(&self) -> Option<&str> {
        match self {
            Scope::Shared => None,
            Scope::Page(id) => Some(id),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Scope {
    fn from(raw: String) -> Self {
        if raw == SHARED_SCOPE {
            Scope::Shared
        } else {
            Scope::Page(raw)
        }
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::Shared => SHARED_SCOPE.to_string(),
            Scope::Page(id) => id,
        }
    }
}

// ============================================================================
// LOCALIZED TEXT
// ============================================================================

/// Value column of a flat entry.
///
/// Rows written by the editor carry a locale map (`{"pt-BR": "..."}`). Some
/// seeded rows hold a bare string, which is served for every locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalizedText {
    Raw(String),
    Localized(BTreeMap<String, String>),
}

impl LocalizedText {
    /// A single-locale value, the shape the edit path writes.
    pub fn single(locale: impl Into<String>, text: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(locale.into(), text.into());
        LocalizedText::Localized(map)
    }

    /// Pick the text for `locale`, then `fallback_locale`, then the raw value.
    pub fn resolve(&self, locale: &str, fallback_locale: &str) -> Option<&str> {
        match self {
            LocalizedText::Raw(text) => Some(text),
            LocalizedText::Localized(map) => map
                .get(locale)
                .or_else(|| map.get(fallback_locale))
                .map(String::as_str),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            LocalizedText::Raw(text) => serde_json::Value::String(text.clone()),
            LocalizedText::Localized(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(locale, text)| (locale.clone(), serde_json::Value::String(text.clone())))
                    .collect(),
            ),
        }
    }
}

// ============================================================================
// ROWS
// ============================================================================

/// One stored row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatEntry {
    pub scope: Scope,
    /// Dotted/indexed path relative to `scope`.
    pub key: String,
    pub value: LocalizedText,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl FlatEntry {
    pub fn new(scope: Scope, key: impl Into<String>, value: LocalizedText) -> Self {
        let now = Utc::now();
        Self {
            scope,
            key: key.into(),
            value,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_updated_at(mut self, updated_at: Timestamp) -> Self {
        self.updated_at = updated_at;
        self
    }

    pub fn entry_ref(&self) -> EntryRef {
        EntryRef {
            scope: self.scope.clone(),
            key: self.key.clone(),
        }
    }
}

/// Identity of a row. Rows are unique on the `(scope, key)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryRef {
    pub scope: Scope,
    pub key: String,
}

impl EntryRef {
    pub fn new(scope: Scope, key: impl Into<String>) -> Self {
        Self {
            scope,
            key: key.into(),
        }
    }
}

/// Upsert payload for one row. Timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryWrite {
    pub scope: Scope,
    pub key: String,
    pub value: LocalizedText,
}

impl EntryWrite {
    pub fn new(scope: Scope, key: impl Into<String>, value: LocalizedText) -> Self {
        Self {
            scope,
            key: key.into(),
            value,
        }
    }

    pub fn entry_ref(&self) -> EntryRef {
        EntryRef::new(self.scope.clone(), self.key.clone())
    }
}

/// Upserts and deletes committed together, all or nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    pub upserts: Vec<EntryWrite>,
    pub deletes: Vec<EntryRef>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(mut self, write: EntryWrite) -> Self {
        self.upserts.push(write);
        self
    }

    pub fn delete(mut self, entry: EntryRef) -> Self {
        self.deletes.push(entry);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.upserts.len() + self.deletes.len()
    }
}
