//! Hard-TTL single flight via the distributed lock.
//!
//! The common path is a plain cache hit with no lock interaction. On a
//! miss, callers funnel through `wait_for_lock` on the key's refresh
//! resource: the winner double-checks the cache, loads, writes with a
//! jittered TTL, and unlocks; waiters that acquire later find the cache
//! populated by the double-check. A caller whose wait times out re-reads
//! the cache once and then falls back to a direct loader call, trading a
//! small stampede risk under sustained contention for never failing the
//! request.
//!
//! Under the lock's assumptions this bounds the loader to one call per key
//! per lock-TTL window, unless the fallback fires.

use std::sync::Arc;

use async_trait::async_trait;
use stampede_core::{CacheResult, CacheTuning};

use super::{CacheStrategy, CacheValue, StrategyCore, ValueLoader};
use crate::lock::DistributedLock;
use crate::store::RemoteStore;

pub struct JitterLockStrategy<S> {
    core: StrategyCore<S>,
    lock: DistributedLock<S>,
}

impl<S: RemoteStore> JitterLockStrategy<S> {
    pub fn new(store: Arc<S>, tuning: CacheTuning) -> Self {
        Self {
            lock: DistributedLock::new(Arc::clone(&store)),
            core: StrategyCore::new(store, tuning),
        }
    }

    /// Fallback when the lock never came: one last cache look, then load
    /// directly. The fallback path writes nothing; the lock holder (or the
    /// next caller) owns the write.
    async fn load_without_lock<T: CacheValue>(
        &self,
        cache_key: &str,
        loader: &Arc<dyn ValueLoader<T>>,
    ) -> CacheResult<Option<T>> {
        if let Some(value) = self.core.read_value::<T>(cache_key).await {
            return Ok(Some(value));
        }
        tracing::warn!(
            key = %cache_key,
            "lock wait exhausted, falling back to a direct origin load"
        );
        Ok(loader.load().await?)
    }
}

#[async_trait]
impl<S: RemoteStore> CacheStrategy for JitterLockStrategy<S> {
    fn name(&self) -> &'static str {
        "jitter-lock"
    }

    async fn get_or_load<T: CacheValue>(
        &self,
        key: &str,
        loader: Arc<dyn ValueLoader<T>>,
    ) -> CacheResult<Option<T>> {
        let cache_key = self.core.cache_key(self.name(), key);

        if let Some(value) = self.core.read_value::<T>(&cache_key).await {
            return Ok(Some(value));
        }

        let resource = self.core.refresh_resource(self.name(), key);
        let tuning = self.core.tuning();
        let waited = self
            .lock
            .wait_for_lock(
                &resource,
                tuning.lock_ttl(),
                tuning.lock_wait_timeout(),
                tuning.lock_retry_interval(),
            )
            .await;

        let guard = match waited {
            Ok(Some(guard)) => guard,
            Ok(None) => return self.load_without_lock(&cache_key, &loader).await,
            Err(error) => {
                tracing::warn!(resource = %resource, %error, "lock acquisition failed");
                return self.load_without_lock(&cache_key, &loader).await;
            }
        };

        // A peer may have populated the cache while we waited.
        if let Some(value) = self.core.read_value::<T>(&cache_key).await {
            if let Err(error) = self.lock.unlock(guard).await {
                tracing::warn!(resource = %resource, %error, "unlock failed");
            }
            return Ok(Some(value));
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
            self.core
                .write_value(&cache_key, value, self.core.jittered_ttl_seconds())
                .await;
        }

        if let Err(error) = self.lock.unlock(guard).await {
            tracing::warn!(resource = %resource, %error, "unlock failed");
        }
        Ok(loaded)
    }

    async fn invalidate(&self, key: &str) -> CacheResult<()> {
        let cache_key = self.core.cache_key(self.name(), key);
        self.core.delete(&cache_key).await
    }
}
