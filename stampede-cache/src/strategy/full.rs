//! Combined protection: SWR plus locked revalidation on every path.
//!
//! Reads behave like `jitter-swr`, but revalidation always goes through the
//! distributed lock: the background refresh takes it with a single
//! `try_lock`, and the foreground expired/miss path waits for it with the
//! same bounds as `jitter-lock`. After acquisition on either path the cache
//! is re-read, and if a fresh envelope appeared in the meantime the
//! revalidation is skipped entirely.
//!
//! Fallback semantics mirror `jitter-lock`: a timed-out waiter re-reads the
//! cache, returns any non-expired value, and otherwise loads directly
//! without writing.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use stampede_core::{CacheResult, CacheTuning, CachedValue, EnvelopeState};

use super::{CacheStrategy, CacheValue, StrategyCore, ValueLoader};
use crate::inflight::RefreshGate;
use crate::lock::{DistributedLock, LockGuard};
use crate::store::RemoteStore;

pub struct FullProtectionStrategy<S> {
    core: StrategyCore<S>,
    lock: DistributedLock<S>,
    gate: RefreshGate,
}

impl<S: RemoteStore> FullProtectionStrategy<S> {
    pub fn new(store: Arc<S>, tuning: CacheTuning) -> Self {
        Self {
            lock: DistributedLock::new(Arc::clone(&store)),
            core: StrategyCore::new(store, tuning),
            gate: RefreshGate::new(),
        }
    }

    async fn release(&self, guard: LockGuard) {
        let resource = guard.resource().to_string();
        if let Err(error) = self.lock.unlock(guard).await {
            tracing::warn!(resource = %resource, %error, "unlock failed");
        }
    }

    /// Background revalidation for the stale branch, gated per process and
    /// locked across the fleet.
    fn schedule_revalidation<T: CacheValue>(
        &self,
        cache_key: String,
        resource: String,
        loader: Arc<dyn ValueLoader<T>>,
    ) {
        let Some(ticket) = self.gate.begin(&cache_key) else {
            tracing::debug!(key = %cache_key, "background refresh already scheduled");
            return;
        };

        let core = self.core.clone();
        let lock = self.lock.clone();
        tokio::spawn(async move {
            let _ticket = ticket;

            let guard = match lock.try_lock(&resource, core.tuning().lock_ttl()).await {
                Ok(Some(guard)) => guard,
                Ok(None) => {
                    tracing::debug!(resource = %resource, "another node is refreshing this key");
                    return;
                }
                Err(error) => {
                    tracing::warn!(resource = %resource, %error, "refresh lock attempt failed");
                    return;
                }
            };

            // A peer may have refreshed while we took the lock; skip if the
            // entry is fresh again.
            let already_fresh = match core.read_value::<CachedValue<T>>(&cache_key).await {
                Some(envelope) => envelope.is_fresh(Utc::now()),
                None => false,
            };

            if !already_fresh {
                match loader.load().await {
                    Ok(Some(value)) => {
                        core.write_envelope(&cache_key, value).await;
                        tracing::debug!(key = %cache_key, "background revalidation refreshed the entry");
                    }
                    Ok(None) => {
                        tracing::debug!(
                            key = %cache_key,
                            "origin reports not-found, keeping the stale entry until hard expiry"
                        );
                    }
                    Err(error) => {
                        tracing::warn!(key = %cache_key, %error, "background revalidation failed");
                    }
                }
            }

            if let Err(error) = lock.unlock(guard).await {
                tracing::warn!(resource = %resource, %error, "unlock failed");
            }
        });
    }

    /// Foreground revalidation for the expired/miss branch: bounded lock
    /// wait, re-check, load, write.
    async fn load_expired<T: CacheValue>(
        &self,
        cache_key: &str,
        resource: &str,
        loader: Arc<dyn ValueLoader<T>>,
    ) -> CacheResult<Option<T>> {
        let tuning = self.core.tuning();
        let waited = self
            .lock
            .wait_for_lock(
                resource,
                tuning.lock_ttl(),
                tuning.lock_wait_timeout(),
                tuning.lock_retry_interval(),
            )
            .await;

        let guard = match waited {
            Ok(Some(guard)) => guard,
            Ok(None) => return self.load_without_lock(cache_key, &loader).await,
            Err(error) => {
                tracing::warn!(resource = %resource, %error, "lock acquisition failed");
                return self.load_without_lock(cache_key, &loader).await;
            }
        };

        // Skip revalidation entirely when a peer already produced a fresh
        // entry; a stale one still gets revalidated while we hold the lock.
        if let Some(envelope) = self.core.read_value::<CachedValue<T>>(cache_key).await {
            if envelope.is_fresh(Utc::now()) {
                self.release(guard).await;
                return Ok(Some(envelope.into_value()));
            }
        }

        let loaded = match loader.load().await {
            Ok(loaded) => loaded,
            Err(origin_error) => {
                self.release(guard).await;
                return Err(origin_error.into());
            }
        };

        if let Some(value) = &loaded {
            self.core.write_envelope(cache_key, value.clone()).await;
        }

        self.release(guard).await;
        Ok(loaded)
    }

    /// Fallback when the lock never came: return any non-expired entry, then
    /// load directly without writing.
    async fn load_without_lock<T: CacheValue>(
        &self,
        cache_key: &str,
        loader: &Arc<dyn ValueLoader<T>>,
    ) -> CacheResult<Option<T>> {
        if let Some(envelope) = self.core.read_value::<CachedValue<T>>(cache_key).await {
            if !envelope.is_expired(Utc::now()) {
                return Ok(Some(envelope.into_value()));
            }
        }
        tracing::warn!(
            key = %cache_key,
            "lock wait exhausted, falling back to a direct origin load"
        );
        Ok(loader.load().await?)
    }
}

#[async_trait]
impl<S: RemoteStore> CacheStrategy for FullProtectionStrategy<S> {
    fn name(&self) -> &'static str {
        "full-protection"
    }

    async fn get_or_load<T: CacheValue>(
        &self,
        key: &str,
        loader: Arc<dyn ValueLoader<T>>,
    ) -> CacheResult<Option<T>> {
        let cache_key = self.core.cache_key(self.name(), key);

        if let Some(envelope) = self.core.read_value::<CachedValue<T>>(&cache_key).await {
            match envelope.state(Utc::now()) {
                EnvelopeState::Fresh => return Ok(Some(envelope.into_value())),
                EnvelopeState::Stale => {
                    let resource = self.core.refresh_resource(self.name(), key);
                    self.schedule_revalidation(cache_key, resource, loader);
                    return Ok(Some(envelope.into_value()));
                }
                EnvelopeState::Expired => {}
            }
        }

        let resource = self.core.refresh_resource(self.name(), key);
        self.load_expired(&cache_key, &resource, loader).await
    }

    async fn invalidate(&self, key: &str) -> CacheResult<()> {
        let cache_key = self.core.cache_key(self.name(), key);
        self.gate.clear(&cache_key);
        self.core.delete(&cache_key).await
    }
}
