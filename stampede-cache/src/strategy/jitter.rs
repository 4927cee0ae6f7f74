//! Read-through strategy with randomized TTL.
//!
//! Identical to `basic` except every write gets a TTL of
//! `base + U{0, jitter_max}` seconds. Keys populated in lockstep (say after
//! a mass invalidation) then expire spread over the jitter window instead of
//! refreshing in one burst.

use std::sync::Arc;

use async_trait::async_trait;
use stampede_core::{CacheResult, CacheTuning};

use super::{CacheStrategy, CacheValue, StrategyCore, ValueLoader};
use crate::store::RemoteStore;

pub struct JitterStrategy<S> {
    core: StrategyCore<S>,
}

impl<S: RemoteStore> JitterStrategy<S> {
    pub fn new(store: Arc<S>, tuning: CacheTuning) -> Self {
        Self {
            core: StrategyCore::new(store, tuning),
        }
    }
}

#[async_trait]
impl<S: RemoteStore> CacheStrategy for JitterStrategy<S> {
    fn name(&self) -> &'static str {
        "jitter"
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

        let Some(loaded) = loader.load().await? else {
            return Ok(None);
        };

        self.core
            .write_value(&cache_key, &loaded, self.core.jittered_ttl_seconds())
            .await;
        Ok(Some(loaded))
    }

    async fn invalidate(&self, key: &str) -> CacheResult<()> {
        let cache_key = self.core.cache_key(self.name(), key);
        self.core.delete(&cache_key).await
    }
}
