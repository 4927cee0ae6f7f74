//! Process-local tracking of in-flight background revalidations.
//!
//! Before scheduling a background refresh, a strategy claims the cache key
//! in the [`RefreshGate`]; the claim is a single concurrent-set insert, so
//! exactly one task wins per key. The returned [`RefreshTicket`] releases
//! the claim on drop, which covers every exit path of the task, panics
//! included.

use std::sync::Arc;

use dashmap::DashSet;

/// Per-process set of cache keys with a scheduled background revalidation.
#[derive(Clone, Default)]
pub struct RefreshGate {
    keys: Arc<DashSet<String>>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim `cache_key` for one background refresh.
    ///
    /// Returns `None` when a refresh for the key is already scheduled.
    pub fn begin(&self, cache_key: &str) -> Option<RefreshTicket> {
        if self.keys.insert(cache_key.to_string()) {
            Some(RefreshTicket {
                keys: Arc::clone(&self.keys),
                cache_key: cache_key.to_string(),
            })
        } else {
            None
        }
    }

    /// Drop any claim on `cache_key`, used by `invalidate`.
    pub fn clear(&self, cache_key: &str) {
        self.keys.remove(cache_key);
    }

    /// Whether a refresh for `cache_key` is currently scheduled.
    pub fn in_flight(&self, cache_key: &str) -> bool {
        self.keys.contains(cache_key)
    }

    /// Number of keys with a scheduled refresh.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Claim on one key's background refresh; releases itself on drop.
pub struct RefreshTicket {
    keys: Arc<DashSet<String>>,
    cache_key: String,
}

impl Drop for RefreshTicket {
    fn drop(&mut self) {
        self.keys.remove(&self.cache_key);
    }
}
