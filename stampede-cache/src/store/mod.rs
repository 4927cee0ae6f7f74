//! Remote key-value store abstraction.
//!
//! Strategies speak to the store through [`RemoteStore`]; values cross the
//! wire as JSON strings and the typed layer lives in the strategy plumbing.
//! Two backends are provided: [`RedisStore`] for production and
//! [`MemoryStore`] for tests and local development.

pub mod memory;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use stampede_core::StoreError;

pub use memory::MemoryStore;
pub use redis::{RedisStore, RedisStoreConfig};

/// Remote key-value store with TTL and the atomic primitives the lock needs.
///
/// Implementations must be safe for concurrent use from unrelated tasks.
/// Every method may block on I/O.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Get the raw value at `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Set `key` to `value` with the given TTL, replacing any prior value.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Atomically set `key` iff absent, with the given TTL.
    ///
    /// Returns true when this caller created the record.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration)
        -> Result<bool, StoreError>;

    /// Delete `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Atomically delete `key` iff its current value equals `expected`.
    ///
    /// Returns true when the record was deleted. This is the ownership proof
    /// behind safe lock release and must be a single server-side operation.
    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, StoreError>;

    /// Remaining TTL of `key`, or `None` if the key is absent or unexpiring.
    async fn ttl_of(&self, key: &str) -> Result<Option<Duration>, StoreError>;
}
