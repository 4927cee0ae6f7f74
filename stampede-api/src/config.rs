//! API Configuration Module
//!
//! Configuration is loaded from environment variables once at startup with
//! sensible defaults for local development; runtime mutation is not
//! supported.

use std::time::Duration;

use stampede_cache::RedisStoreConfig;
use stampede_core::CacheTuning;

/// Default artificial latency of the simulated product database, in ms.
pub const DEFAULT_ORIGIN_DELAY_MS: u64 = 200;

/// Top-level API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Interface to bind (default "0.0.0.0").
    pub bind_host: String,

    /// Port to bind (default 3000).
    pub port: u16,

    /// Remote store connection settings.
    pub redis: RedisStoreConfig,

    /// Artificial latency of the simulated product database.
    pub origin_delay: Duration,

    /// Strategy tunables, shared by all five strategies.
    pub tuning: CacheTuning,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 3000,
            redis: RedisStoreConfig::default(),
            origin_delay: Duration::from_millis(DEFAULT_ORIGIN_DELAY_MS),
            tuning: CacheTuning::default(),
        }
    }
}

impl ApiConfig {
    /// Create from environment variables.
    ///
    /// Environment variables:
    /// - `STAMPEDE_API_BIND`: Bind interface (default: 0.0.0.0)
    /// - `PORT` or `STAMPEDE_API_PORT`: Bind port (default: 3000)
    /// - `STAMPEDE_ORIGIN_DELAY_MS`: Simulated database latency (default: 200)
    /// - `STAMPEDE_REDIS_URL` and the `STAMPEDE_*` tuning variables are read
    ///   by [`RedisStoreConfig::from_env`] and [`CacheTuning::from_env`].
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("STAMPEDE_API_PORT").ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        let origin_delay_ms = std::env::var("STAMPEDE_ORIGIN_DELAY_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_ORIGIN_DELAY_MS);

        Self {
            bind_host: std::env::var("STAMPEDE_API_BIND")
                .unwrap_or_else(|_| defaults.bind_host.clone()),
            port,
            redis: RedisStoreConfig::from_env(),
            origin_delay: Duration::from_millis(origin_delay_ms),
            tuning: CacheTuning::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.bind_host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.origin_delay, Duration::from_millis(200));
        assert_eq!(config.tuning.base_ttl_seconds, 60);
    }
}
