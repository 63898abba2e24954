//! VITRINE Core - Granular Content Model
//!
//! Site text is stored as flat rows (`scope`, `key`, localized `value`) and
//! served as one nested JSON tree per page. This crate holds the pieces that
//! translate between the two shapes and carry no I/O:
//!
//! - [`path`]: dotted/indexed key parsing (`treatments[0].details`)
//! - [`tree`]: positional tree building and the inverse flattening
//! - [`namespace`]: page vs shared scope resolution for reads and writes
//! - [`entry`]: the stored row types
//! - [`error`] and [`config`]: the shared error taxonomy and content settings

pub mod config;
pub mod entry;
pub mod error;
pub mod namespace;
pub mod path;
pub mod tree;

pub use config::{ContentConfig, UnprefixedKeyPolicy};
pub use entry::{
    EntryRef, EntryWrite, FlatEntry, LocalizedText, Scope, WriteBatch, DEFAULT_LOCALE,
    SHARED_SCOPE,
};
pub use error::{
    CacheError, ConfigError, ContentError, ContentResult, StoreError, ValidationError,
};
pub use namespace::{strip_scope_prefix, EditFlags, NamespaceResolver, StorageTarget};
pub use path::{parse_key, parse_segment, render_key, Segment};
pub use tree::{
    flatten, index_over_limit, ApplyOutcome, TreeBuilder, ARRAY_INDEX_CEILING,
    DEFAULT_MAX_ARRAY_INDEX,
};

/// Content tree node. Leaves are strings, containers are arrays and objects.
pub type ContentTree = serde_json::Value;

/// Timestamp type using UTC timezone.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
