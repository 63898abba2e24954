//! Namespace resolution between page keys and shared keys.
//!
//! Entries live under a scope: `__shared__` for content reused across pages,
//! or a page id. Keys are stored without their scope prefix, but legacy rows
//! and editor payloads sometimes still carry one (`home.hero.title`,
//! `__shared__.footer.copyright`). The resolver is the one place that maps
//! between stored `(scope, key)` pairs and the tree paths a page sees.

use crate::config::UnprefixedKeyPolicy;
use crate::entry::{Scope, SHARED_SCOPE};

/// Strip a leading `<scope>.` from `key`, if present.
pub fn strip_scope_prefix<'a>(key: &'a str, scope: &str) -> Option<&'a str> {
    key.strip_prefix(scope)?.strip_prefix('.')
}

/// Flags attached to one edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditFlags {
    pub is_shared: bool,
    /// Page that owns the edited key, when it differs from the page being
    /// edited.
    pub target_page: Option<String>,
}

impl EditFlags {
    pub fn shared() -> Self {
        Self {
            is_shared: true,
            target_page: None,
        }
    }

    pub fn for_page(page: impl Into<String>) -> Self {
        Self {
            is_shared: false,
            target_page: Some(page.into()),
        }
    }
}

/// Where an edit lands in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageTarget {
    pub scope: Scope,
    pub key: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NamespaceResolver {
    policy: UnprefixedKeyPolicy,
}

impl NamespaceResolver {
    pub fn new(policy: UnprefixedKeyPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> UnprefixedKeyPolicy {
        self.policy
    }

    /// Tree key for a stored entry when assembling `page_id`.
    ///
    /// Shared keys keep their full path. Page keys drop a redundant
    /// `<pageId>.` prefix. Entries of any other scope are not visible.
    pub fn resolve_read<'a>(&self, page_id: &str, scope: &Scope, key: &'a str) -> Option<&'a str> {
        match scope {
            Scope::Shared => Some(strip_scope_prefix(key, SHARED_SCOPE).unwrap_or(key)),
            Scope::Page(owner) if owner == page_id => {
                Some(strip_scope_prefix(key, page_id).unwrap_or(key))
            }
            Scope::Page(_) => None,
        }
    }

    /// Storage location for an edit submitted against `page_id`.
    pub fn resolve_write(&self, page_id: &str, edit_key: &str, flags: &EditFlags) -> StorageTarget {
        let explicit_shared = strip_scope_prefix(edit_key, SHARED_SCOPE);
        let page_prefixed = strip_scope_prefix(edit_key, page_id).is_some();

        let shared = flags.is_shared
            || explicit_shared.is_some()
            || (self.policy == UnprefixedKeyPolicy::Shared
                && !page_prefixed
                && flags.target_page.is_none());

        if shared {
            return StorageTarget {
                scope: Scope::Shared,
                key: explicit_shared.unwrap_or(edit_key).to_string(),
            };
        }

        let owner = flags
            .target_page
            .as_deref()
            .filter(|page| !page.is_empty())
            .unwrap_or(page_id);
        let key = strip_scope_prefix(edit_key, owner)
            .or_else(|| strip_scope_prefix(edit_key, page_id))
            .unwrap_or(edit_key);

        StorageTarget {
            scope: Scope::parse(owner),
            key: key.to_string(),
        }
    }
}
