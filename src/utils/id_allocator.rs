use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::OrderId;

/// Lock-free allocator for unique, strictly increasing order ids.
///
/// An explicit instance rather than process-wide state: each engine (or
/// test) owns its own counter, usually behind an `Arc`. Ids start at 1 so
/// that 0 stays available as a "never assigned" value.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator {
            next: AtomicU64::new(1),
        }
    }

    /// Return the next id. Safe to call from any thread without external
    /// synchronization; no two calls ever return the same value.
    pub fn next(&self) -> OrderId {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
