//! In-memory store for tests and local development.
//!
//! Entries carry an absolute expiry and are evicted lazily on read. The
//! read-modify-write primitives (`set_if_absent`, `compare_and_delete`) are
//! serialized through a single mutex so they match the atomicity the Redis
//! backend gets from the server.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use stampede_core::StoreError;

use super::RemoteStore;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-memory [`RemoteStore`] backend.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
    // Serializes the check-then-act pairs in set_if_absent/compare_and_delete.
    atomic_ops: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries (expired records may still be counted until
    /// the next read touches them).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lock_atomic(&self) -> std::sync::MutexGuard<'_, ()> {
        // A poisoned guard only means a peer panicked mid-section; the data
        // itself lives in the DashMap and stays consistent.
        self.atomic_ops
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                return Ok(Some(entry.value.clone()));
            }
        }
        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let _atomic = self.lock_atomic();
        let now = Instant::now();

        let occupied = match self.entries.get(key) {
            Some(entry) => entry.is_live(now),
            None => false,
        };
        if occupied {
            return Ok(false);
        }

        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let _atomic = self.lock_atomic();
        let now = Instant::now();

        let matched = match self.entries.get(key) {
            Some(entry) => entry.is_live(now) && entry.value == expected,
            None => false,
        };
        if matched {
            self.entries.remove(key);
        }
        Ok(matched)
    }

    async fn ttl_of(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let now = Instant::now();
        let remaining = match self.entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.expires_at - now),
            _ => None,
        };
        Ok(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let store = MemoryStore::new();
        store
            .set("k", "v", Duration::from_secs(60))
            .await
            .expect("set succeeds");
        assert_eq!(store.get("k").await.expect("get succeeds"), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_absent() {
        let store = MemoryStore::new();
        store
            .set("k", "v", Duration::from_millis(10))
            .await
            .expect("set succeeds");
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.get("k").await.expect("get succeeds"), None);
        assert!(store.is_empty(), "expired entry is evicted on read");
    }

    #[tokio::test]
    async fn test_set_if_absent_claims_once() {
        let store = MemoryStore::new();
        assert!(store
            .set_if_absent("k", "first", Duration::from_secs(60))
            .await
            .expect("first claim succeeds"));
        assert!(!store
            .set_if_absent("k", "second", Duration::from_secs(60))
            .await
            .expect("second claim resolves"));
        assert_eq!(
            store.get("k").await.expect("get succeeds"),
            Some("first".to_string())
        );
    }

    #[tokio::test]
    async fn test_set_if_absent_reclaims_expired_record() {
        let store = MemoryStore::new();
        assert!(store
            .set_if_absent("k", "first", Duration::from_millis(10))
            .await
            .expect("first claim succeeds"));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(store
            .set_if_absent("k", "second", Duration::from_secs(60))
            .await
            .expect("reclaim succeeds"));
    }

    #[tokio::test]
    async fn test_compare_and_delete_requires_match() {
        let store = MemoryStore::new();
        store
            .set("k", "token-a", Duration::from_secs(60))
            .await
            .expect("set succeeds");

        assert!(!store
            .compare_and_delete("k", "token-b")
            .await
            .expect("mismatch resolves"));
        assert!(store
            .compare_and_delete("k", "token-a")
            .await
            .expect("match resolves"));
        assert_eq!(store.get("k").await.expect("get succeeds"), None);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        store.delete("missing").await.expect("delete succeeds");
        store.delete("missing").await.expect("repeat succeeds");
    }

    #[tokio::test]
    async fn test_ttl_of_reports_remaining_window() {
        let store = MemoryStore::new();
        store
            .set("k", "v", Duration::from_secs(60))
            .await
            .expect("set succeeds");

        let remaining = store
            .ttl_of("k")
            .await
            .expect("ttl query succeeds")
            .expect("key has a ttl");
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining > Duration::from_secs(58));
        assert_eq!(store.ttl_of("missing").await.expect("ttl query succeeds"), None);
    }
}
