//! Shared application state for Axum routers.

use std::sync::Arc;

use stampede_cache::{
    BasicStrategy, FullProtectionStrategy, JitterLockStrategy, JitterStrategy, JitterSwrStrategy,
    RemoteStore,
};
use stampede_core::CacheTuning;

use crate::repo::ProductRepository;

/// The five strategies, built once over a shared store handle.
pub struct Strategies<S> {
    pub basic: BasicStrategy<S>,
    pub jitter: JitterStrategy<S>,
    pub jitter_swr: JitterSwrStrategy<S>,
    pub jitter_lock: JitterLockStrategy<S>,
    pub full_protection: FullProtectionStrategy<S>,
}

impl<S: RemoteStore> Strategies<S> {
    pub fn new(store: Arc<S>, tuning: CacheTuning) -> Self {
        Self {
            basic: BasicStrategy::new(Arc::clone(&store), tuning.clone()),
            jitter: JitterStrategy::new(Arc::clone(&store), tuning.clone()),
            jitter_swr: JitterSwrStrategy::new(Arc::clone(&store), tuning.clone()),
            jitter_lock: JitterLockStrategy::new(Arc::clone(&store), tuning.clone()),
            full_protection: FullProtectionStrategy::new(store, tuning),
        }
    }
}

/// Application-wide state shared across all routes.
pub struct AppState<S> {
    pub store: Arc<S>,
    pub repo: Arc<ProductRepository>,
    pub strategies: Arc<Strategies<S>>,
    pub start_time: std::time::Instant,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            repo: Arc::clone(&self.repo),
            strategies: Arc::clone(&self.strategies),
            start_time: self.start_time,
        }
    }
}

impl<S: RemoteStore> AppState<S> {
    pub fn new(store: Arc<S>, repo: Arc<ProductRepository>, tuning: CacheTuning) -> Self {
        Self {
            strategies: Arc::new(Strategies::new(Arc::clone(&store), tuning)),
            store,
            repo,
            start_time: std::time::Instant::now(),
        }
    }
}
