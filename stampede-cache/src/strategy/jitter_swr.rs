//! Stale-while-revalidate with jittered TTL.
//!
//! Values live in a two-tier envelope. A fresh hit returns with no side
//! effects. A stale hit returns the stale value immediately and schedules at
//! most one background revalidation: the process-local refresh gate admits a
//! single task per key, and the cross-process refresh lock admits a single
//! node per key. An expired or absent entry is single-flighted in the
//! foreground through one `try_lock` attempt, with losers sleeping on the
//! *cache* rather than the lock.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use stampede_core::{CacheResult, CacheTuning, CachedValue, EnvelopeState};

use super::{CacheStrategy, CacheValue, StrategyCore, ValueLoader};
use crate::inflight::RefreshGate;
use crate::lock::DistributedLock;
use crate::store::RemoteStore;

pub struct JitterSwrStrategy<S> {
    core: StrategyCore<S>,
    lock: DistributedLock<S>,
    gate: RefreshGate,
}

impl<S: RemoteStore> JitterSwrStrategy<S> {
    pub fn new(store: Arc<S>, tuning: CacheTuning) -> Self {
        Self {
            lock: DistributedLock::new(Arc::clone(&store)),
            core: StrategyCore::new(store, tuning),
            gate: RefreshGate::new(),
        }
    }

    /// Schedule one background revalidation for `cache_key`.
    ///
    /// The gate claim happens before spawning; if another task already holds
    /// the claim this is a no-op. The spawned task runs to completion even if
    /// the triggering request has long since responded.
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
            // Held for the lifetime of the task; released on every exit path.
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

            if let Err(error) = lock.unlock(guard).await {
                tracing::warn!(resource = %resource, %error, "unlock failed");
            }
        });
    }

    /// Synchronous single flight for the expired/absent branch.
    async fn load_expired<T: CacheValue>(
        &self,
        cache_key: &str,
        resource: &str,
        loader: Arc<dyn ValueLoader<T>>,
    ) -> CacheResult<Option<T>> {
        let tuning = self.core.tuning();

        let guard = match self.lock.try_lock(resource, tuning.lock_ttl()).await {
            Ok(guard) => guard,
            Err(error) => {
                tracing::warn!(resource = %resource, %error, "lock attempt failed");
                None
            }
        };

        if let Some(guard) = guard {
            // A peer may have repopulated while we raced for the lock.
            if let Some(envelope) = self.core.read_value::<CachedValue<T>>(cache_key).await {
                if !envelope.is_expired(Utc::now()) {
                    if let Err(error) = self.lock.unlock(guard).await {
                        tracing::warn!(resource = %resource, %error, "unlock failed");
                    }
                    return Ok(Some(envelope.into_value()));
                }
            }

            let loaded = match loader.load().await {
                Ok(loaded) => loaded,
                Err(origin_error) => {
                    if let Err(error) = self.lock.unlock(guard).await {
                        tracing::warn!(resource = %resource, %error, "unlock failed");
                    }
                    return Err(origin_error.into());
                }
            };

            if let Some(value) = &loaded {
                self.core.write_envelope(cache_key, value.clone()).await;
            }

            if let Err(error) = self.lock.unlock(guard).await {
                tracing::warn!(resource = %resource, %error, "unlock failed");
            }
            return Ok(loaded);
        }

        // Sleep on the cache, not on the lock: during a synchronized herd the
        // winner repopulates the entry before releasing the lock, so waiters
        // poll the entry and never re-contend. A loader slower than the lock
        // TTL defeats this bet and sends waiters to the fallback below.
        for _ in 0..tuning.lock_max_retries {
            tokio::time::sleep(tuning.lock_retry_interval()).await;
            if let Some(envelope) = self.core.read_value::<CachedValue<T>>(cache_key).await {
                if !envelope.is_expired(Utc::now()) {
                    return Ok(Some(envelope.into_value()));
                }
            }
        }

        tracing::warn!(
            key = %cache_key,
            "no refreshed entry appeared, falling back to a direct origin load"
        );
        Ok(loader.load().await?)
    }
}

#[async_trait]
impl<S: RemoteStore> CacheStrategy for JitterSwrStrategy<S> {
    fn name(&self) -> &'static str {
        "jitter-swr"
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
