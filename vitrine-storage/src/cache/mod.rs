//! Page cache layer.
//!
//! Assembled page trees are cached whole, keyed by page id. The cache is
//! disposable: any committed write clears all of it, and every read can be
//! served from the backing store alone.
//!
//! [`WriteGeneration`] orders cache population against invalidation so a
//! read that overlapped a write never repopulates stale content.

pub mod generation;
pub mod lmdb_backend;
pub mod memory;
pub mod settings;
pub mod traits;

pub use generation::{GenerationGuard, WriteGeneration};
pub use lmdb_backend::{LmdbCacheError, LmdbPageCache};
pub use memory::InMemoryPageCache;
pub use settings::CacheSettings;
pub use traits::{CacheStats, CachedPage, PageCache};
