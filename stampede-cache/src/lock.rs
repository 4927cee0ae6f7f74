//! Distributed lock over the remote store.
//!
//! `try_lock` atomically sets `lock:<resource>` to a fresh random token iff
//! absent; `unlock` is an atomic compare-and-delete that proves ownership.
//! The token travels inside the returned [`LockGuard`] and is passed back
//! through the call chain, so concurrent tasks in one process never observe
//! each other's tokens.
//!
//! At most one holder exists per resource at a time, assuming sane clocks
//! and a TTL shorter than the critical section's maximum tolerable delay. A
//! holder whose TTL lapses before `unlock` loses the lock silently; its
//! later `unlock` fails the compare and is a no-op.

use std::sync::Arc;
use std::time::Duration;

use stampede_core::StoreError;
use uuid::Uuid;

use crate::store::RemoteStore;

/// Namespace prefix the lock primitive adds to every resource name.
pub const LOCK_KEY_PREFIX: &str = "lock:";

/// Proof of lock ownership for one resource.
///
/// Pass the guard back to [`DistributedLock::unlock`] to release. A guard
/// dropped without unlocking relies on the record's TTL for reclamation.
#[derive(Debug)]
#[must_use = "dropping a LockGuard without unlock() leaves release to the TTL"]
pub struct LockGuard {
    resource: String,
    token: String,
}

impl LockGuard {
    /// The resource this guard holds.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The holder token stored under `lock:<resource>`.
    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Fenced single-holder lock with TTL, safe release, and bounded wait.
pub struct DistributedLock<S> {
    store: Arc<S>,
}

impl<S> Clone for DistributedLock<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: RemoteStore> DistributedLock<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn lock_key(resource: &str) -> String {
        format!("{LOCK_KEY_PREFIX}{resource}")
    }

    /// Attempt to acquire `resource` without waiting.
    ///
    /// Returns a [`LockGuard`] on acquisition, `None` when another holder
    /// owns the record.
    pub async fn try_lock(
        &self,
        resource: &str,
        ttl: Duration,
    ) -> Result<Option<LockGuard>, StoreError> {
        let token = Uuid::new_v4().to_string();
        let acquired = self
            .store
            .set_if_absent(&Self::lock_key(resource), &token, ttl)
            .await?;

        Ok(acquired.then(|| LockGuard {
            resource: resource.to_string(),
            token,
        }))
    }

    /// Release a held lock.
    ///
    /// The compare-and-delete only removes the record while it still holds
    /// this guard's token; a lock already reclaimed by its TTL (and possibly
    /// re-acquired by a peer) is left untouched.
    pub async fn unlock(&self, guard: LockGuard) -> Result<(), StoreError> {
        let released = self
            .store
            .compare_and_delete(&Self::lock_key(&guard.resource), &guard.token)
            .await?;

        if !released {
            tracing::debug!(
                resource = %guard.resource,
                "lock was already reclaimed by its TTL"
            );
        }
        Ok(())
    }

    /// Loop `try_lock` with sleeps of `retry_interval` until acquisition or
    /// until the wall clock exceeds `timeout`.
    ///
    /// The sleeps are plain awaits: cancelling the caller wakes the future
    /// and abandons the wait without holding anything.
    pub async fn wait_for_lock(
        &self,
        resource: &str,
        ttl: Duration,
        timeout: Duration,
        retry_interval: Duration,
    ) -> Result<Option<LockGuard>, StoreError> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if let Some(guard) = self.try_lock(resource, ttl).await? {
                return Ok(Some(guard));
            }
            if tokio::time::Instant::now() + retry_interval > deadline {
                return Ok(None);
            }
            tokio::time::sleep(retry_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn lock_over_memory() -> (DistributedLock<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (DistributedLock::new(Arc::clone(&store)), store)
    }

    #[tokio::test]
    async fn test_try_lock_single_holder() {
        let (lock, _store) = lock_over_memory();

        let guard = lock
            .try_lock("refresh:basic:1", Duration::from_secs(5))
            .await
            .expect("store reachable")
            .expect("first caller acquires");

        assert!(lock
            .try_lock("refresh:basic:1", Duration::from_secs(5))
            .await
            .expect("store reachable")
            .is_none());

        lock.unlock(guard).await.expect("unlock succeeds");
        assert!(lock
            .try_lock("refresh:basic:1", Duration::from_secs(5))
            .await
            .expect("store reachable")
            .is_some());
    }

    #[tokio::test]
    async fn test_lock_record_key_and_token() {
        let (lock, store) = lock_over_memory();

        let guard = lock
            .try_lock("refresh:jitter:9", Duration::from_secs(5))
            .await
            .expect("store reachable")
            .expect("acquires");

        let record = store
            .get("lock:refresh:jitter:9")
            .await
            .expect("store reachable")
            .expect("record exists");
        assert_eq!(record, guard.token());
    }

    #[tokio::test]
    async fn test_unlock_after_ttl_reclaim_is_noop() {
        let (lock, store) = lock_over_memory();

        let stale_guard = lock
            .try_lock("refresh:basic:1", Duration::from_millis(10))
            .await
            .expect("store reachable")
            .expect("acquires");

        tokio::time::sleep(Duration::from_millis(30)).await;

        // A peer re-acquires after the TTL reclaimed the record.
        let peer_guard = lock
            .try_lock("refresh:basic:1", Duration::from_secs(5))
            .await
            .expect("store reachable")
            .expect("peer acquires");

        // The stale holder's unlock must not release the peer's lock.
        lock.unlock(stale_guard).await.expect("noop unlock succeeds");
        let record = store
            .get("lock:refresh:basic:1")
            .await
            .expect("store reachable")
            .expect("peer's record survives");
        assert_eq!(record, peer_guard.token());
    }

    #[tokio::test]
    async fn test_wait_for_lock_times_out() {
        let (lock, _store) = lock_over_memory();

        let _held = lock
            .try_lock("refresh:basic:1", Duration::from_secs(30))
            .await
            .expect("store reachable")
            .expect("acquires");

        let started = std::time::Instant::now();
        let waited = lock
            .wait_for_lock(
                "refresh:basic:1",
                Duration::from_secs(5),
                Duration::from_millis(100),
                Duration::from_millis(20),
            )
            .await
            .expect("store reachable");

        assert!(waited.is_none());
        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_wait_for_lock_acquires_after_release() {
        let (lock, _store) = lock_over_memory();

        let held = lock
            .try_lock("refresh:basic:1", Duration::from_secs(30))
            .await
            .expect("store reachable")
            .expect("acquires");

        let waiter = {
            let lock = lock.clone();
            tokio::spawn(async move {
                lock.wait_for_lock(
                    "refresh:basic:1",
                    Duration::from_secs(5),
                    Duration::from_secs(2),
                    Duration::from_millis(10),
                )
                .await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        lock.unlock(held).await.expect("unlock succeeds");

        let acquired = waiter
            .await
            .expect("waiter task completes")
            .expect("store reachable");
        assert!(acquired.is_some());
    }
}
