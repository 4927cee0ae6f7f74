//! Redis-backed remote store.
//!
//! Uses a multiplexed async connection shared by cloning. TTLs are applied
//! with `PX` so sub-second tunings survive, `set_if_absent` maps to
//! `SET ... NX`, and `compare_and_delete` runs as a server-side Lua script
//! so the read and the delete are one atomic step.

use std::time::Duration;

use async_trait::async_trait;
use ::redis::{aio::MultiplexedConnection, AsyncCommands, Client, Script};
use stampede_core::StoreError;

use super::RemoteStore;

/// Delete the key only when it still holds the expected value.
const COMPARE_AND_DELETE: &str = r#"
if redis.call('get', KEYS[1]) == ARGV[1] then
    return redis.call('del', KEYS[1])
else
    return 0
end
"#;

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379").
    pub url: String,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
        }
    }
}

impl RedisStoreConfig {
    /// Create from environment variables.
    ///
    /// Environment variables:
    /// - `STAMPEDE_REDIS_URL`: Connection URL (default: redis://localhost:6379)
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("STAMPEDE_REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
        }
    }
}

/// Redis-backed [`RemoteStore`].
pub struct RedisStore {
    conn: MultiplexedConnection,
    compare_and_delete: Script,
}

impl RedisStore {
    /// Connect to Redis.
    pub async fn connect(config: &RedisStoreConfig) -> Result<Self, StoreError> {
        let client = Client::open(config.url.as_str()).map_err(|e| StoreError::Connection {
            reason: format!("invalid Redis URL {}: {}", config.url, e),
        })?;

        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Connection {
                reason: format!("connect to {} failed: {}", config.url, e),
            })?;

        Ok(Self {
            conn,
            compare_and_delete: Script::new(COMPARE_AND_DELETE),
        })
    }

    fn ttl_millis(ttl: Duration) -> u64 {
        // Redis rejects PX 0; clamp to the smallest expirable window.
        (ttl.as_millis() as u64).max(1)
    }
}

#[async_trait]
impl RemoteStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| StoreError::command("GET", key, e))?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = ::redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(Self::ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::command("SET", key, e))?;
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = ::redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(Self::ttl_millis(ttl))
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::command("SET NX", key, e))?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .del(key)
            .await
            .map_err(|e| StoreError::command("DEL", key, e))?;
        Ok(())
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = self
            .compare_and_delete
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| StoreError::command("EVALSHA", key, e))?;
        Ok(deleted > 0)
    }

    async fn ttl_of(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut conn = self.conn.clone();
        let millis: i64 = conn
            .pttl(key)
            .await
            .map_err(|e| StoreError::command("PTTL", key, e))?;
        // -2 = absent, -1 = no expiry.
        if millis < 0 {
            Ok(None)
        } else {
            Ok(Some(Duration::from_millis(millis as u64)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_url() {
        let config = RedisStoreConfig::default();
        assert_eq!(config.url, "redis://localhost:6379");
    }

    #[test]
    fn test_ttl_millis_clamps_zero() {
        assert_eq!(RedisStore::ttl_millis(Duration::ZERO), 1);
        assert_eq!(RedisStore::ttl_millis(Duration::from_secs(60)), 60_000);
    }

    #[test]
    fn test_compare_and_delete_script_shape() {
        // The release proof must read and delete in one server-side step.
        assert!(COMPARE_AND_DELETE.contains("redis.call('get', KEYS[1])"));
        assert!(COMPARE_AND_DELETE.contains("redis.call('del', KEYS[1])"));
    }
}
