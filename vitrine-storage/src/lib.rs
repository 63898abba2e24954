//! VITRINE Storage - Backing Store, Page Cache, and Content Service
//!
//! Defines the storage abstractions that sit between the pure tree logic in
//! vitrine-core and the HTTP layer:
//!
//! - [`TextStore`]: durable flat rows (PostgreSQL lives in vitrine-api)
//! - [`PageCache`]: disposable assembled page trees (LMDB or memory)
//! - [`ContentService`]: the read path, write path, and maintenance jobs

pub mod cache;
pub mod service;
pub mod store;

pub use cache::{
    CacheSettings, CacheStats, CachedPage, GenerationGuard, InMemoryPageCache, LmdbCacheError,
    LmdbPageCache, PageCache, WriteGeneration,
};
pub use service::{
    assemble_page, AssembledPage, Assembly, ContentService, ContentSource, EditReport,
    EditRequest, EditResult, ImportReport, NormalizeReport, RefreshReport,
};
pub use store::{InMemoryTextStore, TextStore};
