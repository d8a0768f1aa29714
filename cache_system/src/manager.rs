//! Redis cache backend
//!
//! Keys are namespaced as `{key_prefix}:{key}` when a prefix is configured.
//! The multiplexed connection is opened lazily and shared by clones.

use crate::errors::CacheError;
use crate::Cache;
use async_trait::async_trait;
use config::CacheConfig;
use redis::{AsyncCommands, Client};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Redis-backed [`Cache`]
#[derive(Clone)]
pub struct RedisCache {
    client: Arc<Client>,
    config: Arc<CacheConfig>,
    connection_pool: Arc<RwLock<Option<redis::aio::MultiplexedConnection>>>,
}

impl Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let connection_status = match self.connection_pool.try_read() {
            Ok(pool) if pool.is_some() => "connected",
            Ok(_) => "no_connection",
            Err(_) => "lock_error",
        };

        f.debug_struct("RedisCache")
            .field("key_prefix", &self.config.key_prefix)
            .field("default_ttl", &self.config.default_ttl)
            .field("connected", &connection_status)
            .finish()
    }
}

impl RedisCache {
    /// Create a new Redis cache. No connection is made until the first command.
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        if config.default_ttl == 0 {
            return Err(CacheError::InvalidTtl(config.default_ttl));
        }
        let client = Client::open(config.redis_url.as_str())?;

        Ok(Self {
            client: Arc::new(client),
            config: Arc::new(config),
            connection_pool: Arc::new(RwLock::new(None)),
        })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, CacheError> {
        if let Some(connection) = self.connection_pool.read().await.as_ref() {
            return Ok(connection.clone());
        }

        let mut pool = self.connection_pool.write().await;
        if pool.is_none() {
            let timeout = Duration::from_millis(self.config.connection_timeout_ms);
            let connection =
                tokio::time::timeout(timeout, self.client.get_multiplexed_async_connection())
                    .await
                    .map_err(|_| CacheError::Timeout)??;
            tracing::debug!(key_prefix = %self.config.key_prefix, "redis connection established");
            *pool = Some(connection);
        }

        pool.as_ref()
            .cloned()
            .ok_or_else(|| CacheError::Connection("Failed to get connection from pool".into()))
    }

    /// Full key with the configured namespace
    pub fn build_key(&self, key: &str) -> String {
        if self.config.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.config.key_prefix, key)
        }
    }

    /// Ping Redis to check connectivity
    pub async fn ping(&self) -> Result<String, CacheError> {
        let mut conn = self.get_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong)
    }

    /// Get current configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<String, CacheError> {
        let cache_key = self.build_key(key);
        let mut conn = self.get_connection().await?;

        let cached: Option<String> = conn.get(&cache_key).await?;
        cached.ok_or(CacheError::KeyNotFound(cache_key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let cache_key = self.build_key(key);
        let mut conn = self.get_connection().await?;

        let _: () = conn.set_ex(&cache_key, value, self.config.default_ttl).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        let cache_key = self.build_key(key);
        let mut conn = self.get_connection().await?;

        let _: i64 = conn.del(&cache_key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_key_uses_prefix() {
        let cache = RedisCache::new(CacheConfig::new(
            "redis://127.0.0.1:6379".to_string(),
            60,
            "app".to_string(),
        ))
        .unwrap();
        assert_eq!(cache.build_key("users:id:1"), "app:users:id:1");

        let bare = RedisCache::new(CacheConfig::new(
            "redis://127.0.0.1:6379".to_string(),
            60,
            String::new(),
        ))
        .unwrap();
        assert_eq!(bare.build_key("users:id:1"), "users:id:1");
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let result = RedisCache::new(CacheConfig::new(
            "redis://127.0.0.1:6379".to_string(),
            0,
            String::new(),
        ));
        assert!(matches!(result, Err(CacheError::InvalidTtl(0))));
    }
}
