//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use vitrine_storage::ContentService;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Read and write paths over the backing store and page cache.
    pub content: Arc<ContentService>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(content: Arc<ContentService>) -> Self {
        Self {
            content,
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(Arc<ContentService>, content);
crate::impl_from_ref!(Instant, start_time);
