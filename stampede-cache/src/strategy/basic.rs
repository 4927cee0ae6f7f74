//! Baseline read-through strategy.
//!
//! Stores the bare payload with a fixed TTL and offers no stampede
//! protection: a burst of N concurrent misses yields up to N loader calls.
//! Exists as the control group the protected strategies are measured
//! against.

use std::sync::Arc;

use async_trait::async_trait;
use stampede_core::{CacheResult, CacheTuning};

use super::{CacheStrategy, CacheValue, StrategyCore, ValueLoader};
use crate::store::RemoteStore;

pub struct BasicStrategy<S> {
    core: StrategyCore<S>,
}

impl<S: RemoteStore> BasicStrategy<S> {
    pub fn new(store: Arc<S>, tuning: CacheTuning) -> Self {
        Self {
            core: StrategyCore::new(store, tuning),
        }
    }
}

#[async_trait]
impl<S: RemoteStore> CacheStrategy for BasicStrategy<S> {
    fn name(&self) -> &'static str {
        "basic"
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
            // Not-found is transparent: nothing is written.
            return Ok(None);
        };

        self.core
            .write_value(&cache_key, &loaded, self.core.tuning().base_ttl_seconds)
            .await;
        Ok(Some(loaded))
    }

    async fn invalidate(&self, key: &str) -> CacheResult<()> {
        let cache_key = self.core.cache_key(self.name(), key);
        self.core.delete(&cache_key).await
    }
}
