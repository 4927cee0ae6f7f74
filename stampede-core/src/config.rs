//! Engine tunables.
//!
//! A flat set of knobs shared by every strategy, loaded once at startup.
//! Runtime mutation is not supported; rebuild the strategies to retune.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Nominal TTL applied to cache writes, in seconds.
pub const DEFAULT_BASE_TTL_SECONDS: u64 = 60;
/// Upper bound of the uniform additive TTL jitter, in seconds.
pub const DEFAULT_JITTER_MAX_SECONDS: u64 = 10;
/// Soft-TTL fraction of the total TTL for SWR envelopes.
pub const DEFAULT_SOFT_TTL_RATIO: f64 = 0.8;
/// TTL of a held revalidation lock, in seconds.
pub const DEFAULT_LOCK_TIMEOUT_SECONDS: u64 = 5;
/// Sleep between lock acquisition retries, in milliseconds.
pub const DEFAULT_LOCK_RETRY_INTERVAL_MS: u64 = 50;
/// Lock acquisition retry count; total wait is the product with the interval.
pub const DEFAULT_LOCK_MAX_RETRIES: u32 = 100;

/// Tunables shared by every cache strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheTuning {
    /// Nominal TTL for cache writes.
    pub base_ttl_seconds: u64,
    /// Upper bound of the uniform integer jitter added to the base TTL.
    pub jitter_max_seconds: u64,
    /// Fraction of the total TTL after which an envelope turns stale.
    pub soft_ttl_ratio: f64,
    /// TTL of a held lock; bounds how long a crashed holder blocks peers.
    pub lock_timeout_seconds: u64,
    /// Sleep between lock acquisition retries.
    pub lock_retry_interval_ms: u64,
    /// Retry count for bounded lock waits.
    pub lock_max_retries: u32,
}

impl Default for CacheTuning {
    fn default() -> Self {
        Self {
            base_ttl_seconds: DEFAULT_BASE_TTL_SECONDS,
            jitter_max_seconds: DEFAULT_JITTER_MAX_SECONDS,
            soft_ttl_ratio: DEFAULT_SOFT_TTL_RATIO,
            lock_timeout_seconds: DEFAULT_LOCK_TIMEOUT_SECONDS,
            lock_retry_interval_ms: DEFAULT_LOCK_RETRY_INTERVAL_MS,
            lock_max_retries: DEFAULT_LOCK_MAX_RETRIES,
        }
    }
}

impl CacheTuning {
    /// Create a tuning with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `STAMPEDE_BASE_TTL_SECONDS`: Nominal TTL (default: 60)
    /// - `STAMPEDE_JITTER_MAX_SECONDS`: Jitter upper bound (default: 10)
    /// - `STAMPEDE_SOFT_TTL_RATIO`: Soft-TTL fraction (default: 0.8)
    /// - `STAMPEDE_LOCK_TIMEOUT_SECONDS`: Held-lock TTL (default: 5)
    /// - `STAMPEDE_LOCK_RETRY_INTERVAL_MS`: Retry sleep in ms (default: 50)
    /// - `STAMPEDE_LOCK_MAX_RETRIES`: Retry count (default: 100)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            base_ttl_seconds: std::env::var("STAMPEDE_BASE_TTL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.base_ttl_seconds),
            jitter_max_seconds: std::env::var("STAMPEDE_JITTER_MAX_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.jitter_max_seconds),
            soft_ttl_ratio: std::env::var("STAMPEDE_SOFT_TTL_RATIO")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.soft_ttl_ratio),
            lock_timeout_seconds: std::env::var("STAMPEDE_LOCK_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.lock_timeout_seconds),
            lock_retry_interval_ms: std::env::var("STAMPEDE_LOCK_RETRY_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.lock_retry_interval_ms),
            lock_max_retries: std::env::var("STAMPEDE_LOCK_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.lock_max_retries),
        }
    }

    /// Set the base TTL.
    pub fn with_base_ttl_seconds(mut self, seconds: u64) -> Self {
        self.base_ttl_seconds = seconds;
        self
    }

    /// Set the jitter upper bound.
    pub fn with_jitter_max_seconds(mut self, seconds: u64) -> Self {
        self.jitter_max_seconds = seconds;
        self
    }

    /// Set the soft-TTL ratio.
    pub fn with_soft_ttl_ratio(mut self, ratio: f64) -> Self {
        self.soft_ttl_ratio = ratio;
        self
    }

    /// Set the held-lock TTL.
    pub fn with_lock_timeout_seconds(mut self, seconds: u64) -> Self {
        self.lock_timeout_seconds = seconds;
        self
    }

    /// Set the lock retry interval.
    pub fn with_lock_retry_interval_ms(mut self, millis: u64) -> Self {
        self.lock_retry_interval_ms = millis;
        self
    }

    /// Set the lock retry count.
    pub fn with_lock_max_retries(mut self, retries: u32) -> Self {
        self.lock_max_retries = retries;
        self
    }

    /// TTL of a held lock as a `Duration`.
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_seconds)
    }

    /// Sleep between lock acquisition retries as a `Duration`.
    pub fn lock_retry_interval(&self) -> Duration {
        Duration::from_millis(self.lock_retry_interval_ms)
    }

    /// Total bounded wait for a lock: `retries × retry_interval`.
    pub fn lock_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_retry_interval_ms * self.lock_max_retries as u64)
    }
}
