//! Cache-access strategies sharing one contract.
//!
//! Every strategy answers `get_or_load(key, loader)`: return a cached value
//! when its guarantees allow, otherwise consult the loader, and return
//! `None` only when a fresh loader invocation says not-found and no usable
//! cached value exists.
//!
//! # Key derivation
//!
//! The remote-store key is `product:<strategy>:<key>`. The namespace per
//! strategy is mandatory: envelope and bare payload formats never collide,
//! and a benchmark comparing strategies on the same logical key stays
//! well-defined. Revalidation locks live under `refresh:<strategy>:<key>`
//! (the lock primitive adds its own `lock:` prefix on top).

pub mod basic;
pub mod full;
pub mod jitter;
pub mod jitter_lock;
pub mod jitter_swr;

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use stampede_core::{CacheResult, CacheTuning, OriginError};

use crate::store::RemoteStore;

pub use basic::BasicStrategy;
pub use full::FullProtectionStrategy;
pub use jitter::JitterStrategy;
pub use jitter_lock::JitterLockStrategy;
pub use jitter_swr::JitterSwrStrategy;

/// Namespace prefix shared by every strategy's cache keys.
pub const CACHE_KEY_PREFIX: &str = "product";
/// Prefix of revalidation lock resources.
pub const REFRESH_RESOURCE_PREFIX: &str = "refresh";

/// Marker for payload types the strategies can cache.
///
/// The bounds are what round-tripping through the remote store and handing
/// values to background tasks require; any ordinary data type qualifies.
pub trait CacheValue: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Caller-supplied origin of fresh values, typically a slow database query.
///
/// `Ok(None)` means not-found and is a legitimate result, not an error.
/// Implementations may block, must be safe to call from a background task,
/// and must not retain references to strategy internals.
#[async_trait]
pub trait ValueLoader<T>: Send + Sync {
    async fn load(&self) -> Result<Option<T>, OriginError>;
}

/// Adapter turning an async closure into a [`ValueLoader`].
pub struct FnLoader<F>(F);

impl<F> FnLoader<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<T, F, Fut> ValueLoader<T> for FnLoader<F>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Option<T>, OriginError>> + Send,
{
    async fn load(&self) -> Result<Option<T>, OriginError> {
        (self.0)().await
    }
}

/// The contract every strategy exposes to request handlers.
#[async_trait]
pub trait CacheStrategy: Send + Sync {
    /// Stable identifier used in the cache key and in log fields.
    fn name(&self) -> &'static str;

    /// Return a value satisfying this strategy's guarantees, or `None` iff a
    /// fresh loader invocation returns not-found and no usable cached value
    /// exists. At most one loader call happens per invocation.
    async fn get_or_load<T: CacheValue>(
        &self,
        key: &str,
        loader: Arc<dyn ValueLoader<T>>,
    ) -> CacheResult<Option<T>>;

    /// Delete the cache entry in this strategy's namespace and clear any
    /// refresh-in-flight marker. Idempotent.
    async fn invalidate(&self, key: &str) -> CacheResult<()>;
}

/// Shared plumbing composed by every strategy: store handle, tuning, key
/// derivation, TTL computation, and the typed read/write path with its
/// fail-open policy.
pub struct StrategyCore<S> {
    store: Arc<S>,
    tuning: CacheTuning,
}

impl<S> Clone for StrategyCore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            tuning: self.tuning.clone(),
        }
    }
}

impl<S: RemoteStore> StrategyCore<S> {
    pub fn new(store: Arc<S>, tuning: CacheTuning) -> Self {
        Self { store, tuning }
    }

    pub fn tuning(&self) -> &CacheTuning {
        &self.tuning
    }

    /// `product:<strategy>:<key>`.
    pub fn cache_key(&self, strategy_name: &str, key: &str) -> String {
        format!("{CACHE_KEY_PREFIX}:{strategy_name}:{key}")
    }

    /// `refresh:<strategy>:<key>`, the lock resource for revalidation.
    pub fn refresh_resource(&self, strategy_name: &str, key: &str) -> String {
        format!("{REFRESH_RESOURCE_PREFIX}:{strategy_name}:{key}")
    }

    /// Uniform integer jitter in `[0, jitter_max_seconds]`.
    pub fn random_jitter_seconds(&self) -> u64 {
        rand::thread_rng().gen_range(0..=self.tuning.jitter_max_seconds)
    }

    /// `base_ttl_seconds` plus a fresh jitter sample.
    pub fn jittered_ttl_seconds(&self) -> u64 {
        self.tuning.base_ttl_seconds + self.random_jitter_seconds()
    }

    /// Read and decode the entry at `cache_key`.
    ///
    /// Store failures and undecodable entries are logged and read as a miss;
    /// a stale undecodable record stays in place until the next successful
    /// loader result overwrites it.
    pub async fn read_value<T: DeserializeOwned>(&self, cache_key: &str) -> Option<T> {
        let raw = match self.store.get(cache_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(error) => {
                tracing::warn!(key = %cache_key, %error, "store read failed, treating as miss");
                return None;
            }
        };
        decode_value(cache_key, &raw)
    }

    /// Encode and write `value` with a TTL of `ttl_seconds`.
    ///
    /// A failed write is logged and dropped; the next caller retries it
    /// implicitly.
    pub async fn write_value<T: Serialize>(&self, cache_key: &str, value: &T, ttl_seconds: u64) {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(error) => {
                tracing::warn!(key = %cache_key, %error, "serialization failed, dropping write");
                return;
            }
        };

        let ttl = std::time::Duration::from_secs(ttl_seconds);
        if let Err(error) = self.store.set(cache_key, &encoded, ttl).await {
            tracing::warn!(key = %cache_key, %error, "store write failed, dropping write");
        }
    }

    /// Seal `value` into a fresh envelope and write it.
    ///
    /// The store TTL equals the envelope's total TTL, so the record vanishes
    /// no later than its own hard expiry.
    pub async fn write_envelope<T: Serialize>(&self, cache_key: &str, value: T) {
        let (envelope, total_ttl) = stampede_core::CachedValue::seal(
            value,
            self.tuning.base_ttl_seconds,
            self.tuning.soft_ttl_ratio,
            self.random_jitter_seconds(),
        );
        self.write_value(cache_key, &envelope, total_ttl).await;
    }

    /// Delete the entry at `cache_key`.
    pub async fn delete(&self, cache_key: &str) -> CacheResult<()> {
        self.store.delete(cache_key).await?;
        Ok(())
    }
}

/// Decode a raw store entry, going through a generic JSON value first so
/// payloads written without discriminator metadata still coerce to the
/// requested concrete type. A failed coercion is a miss, not an error.
fn decode_value<T: DeserializeOwned>(cache_key: &str, raw: &str) -> Option<T> {
    let generic: serde_json::Value = match serde_json::from_str(raw) {
        Ok(generic) => generic,
        Err(error) => {
            tracing::warn!(key = %cache_key, %error, "undecodable cache entry, treating as miss");
            return None;
        }
    };

    match serde_json::from_value(generic) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(
                key = %cache_key,
                %error,
                "cached entry did not coerce to the requested type, treating as miss"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde::Deserialize;

    fn core_over_memory() -> (StrategyCore<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (
            StrategyCore::new(Arc::clone(&store), CacheTuning::default()),
            store,
        )
    }

    #[test]
    fn test_key_derivation() {
        let (core, _store) = core_over_memory();
        assert_eq!(core.cache_key("jitter-swr", "42"), "product:jitter-swr:42");
        assert_eq!(
            core.refresh_resource("jitter-swr", "42"),
            "refresh:jitter-swr:42"
        );
    }

    #[test]
    fn test_jittered_ttl_within_bounds() {
        let (core, _store) = core_over_memory();
        for _ in 0..200 {
            let ttl = core.jittered_ttl_seconds();
            assert!((60..=70).contains(&ttl), "ttl {ttl} out of [60, 70]");
        }
    }

    #[tokio::test]
    async fn test_read_value_coerces_generic_map() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Payload {
            name: String,
            count: u32,
        }

        let (core, store) = core_over_memory();
        // Written by a peer without discriminator metadata.
        store
            .set(
                "product:basic:1",
                r#"{"name":"widget","count":3}"#,
                std::time::Duration::from_secs(60),
            )
            .await
            .expect("seed write succeeds");

        let value: Option<Payload> = core.read_value("product:basic:1").await;
        assert_eq!(
            value,
            Some(Payload {
                name: "widget".to_string(),
                count: 3
            })
        );
    }

    #[tokio::test]
    async fn test_read_value_failed_coercion_is_miss() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Payload {
            count: u32,
        }

        let (core, store) = core_over_memory();
        store
            .set(
                "product:basic:1",
                r#"{"count":"not-a-number"}"#,
                std::time::Duration::from_secs(60),
            )
            .await
            .expect("seed write succeeds");

        let value: Option<Payload> = core.read_value("product:basic:1").await;
        assert!(value.is_none());

        // The undecodable record stays for the next loader result to replace.
        assert!(store
            .get("product:basic:1")
            .await
            .expect("store reachable")
            .is_some());
    }

    #[tokio::test]
    async fn test_write_then_read_roundtrip() {
        let (core, _store) = core_over_memory();
        core.write_value("product:basic:1", &"hello".to_string(), 60)
            .await;

        let value: Option<String> = core.read_value("product:basic:1").await;
        assert_eq!(value, Some("hello".to_string()));
    }
}
