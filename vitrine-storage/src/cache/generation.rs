//! Write generation counter guarding cache population.
//!
//! Every committed write bumps the generation before it clears the cache.
//! A read records the generation before fetching rows and may only store
//! its tree if the generation is unchanged. The check and the store happen
//! under the same lock as bump-and-clear, so a tree assembled from rows
//! that predate a write can never outlive that write's invalidation.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct WriteGeneration {
    current: AtomicU64,
    gate: Mutex<()>,
}

impl WriteGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Hold the gate while checking or bumping.
    pub async fn lock(&self) -> GenerationGuard<'_> {
        GenerationGuard {
            generation: self,
            _gate: self.gate.lock().await,
        }
    }
}

/// Exclusive access to the generation for one check-and-put or
/// bump-and-clear sequence.
pub struct GenerationGuard<'a> {
    generation: &'a WriteGeneration,
    _gate: MutexGuard<'a, ()>,
}

impl GenerationGuard<'_> {
    pub fn is_current(&self, observed: u64) -> bool {
        self.generation.current() == observed
    }

    /// Advance the generation and return the new value.
    pub fn bump(&self) -> u64 {
        self.generation.current.fetch_add(1, Ordering::SeqCst) + 1
    }
}
