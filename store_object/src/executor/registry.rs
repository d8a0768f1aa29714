//! Named connection pools
//!
//! Pools are registered once at startup and looked up on every request.
//! A descriptor with a read DSN also registers its replica under
//! `"{name}_read"`.

use crate::errors::DbError;
use crate::executor::DbPool;
use config::{read_connection_name, AppConfig, ConnectionConfig, Driver};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::info;

#[derive(Debug, Default)]
pub struct Registry {
    pools: RwLock<HashMap<String, DbPool>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect every descriptor of `config`
    pub async fn from_config(config: &AppConfig) -> Result<Self, DbError> {
        config
            .validate()
            .map_err(|e| DbError::Config(e.to_string()))?;
        let registry = Self::new();
        for connection in &config.connections {
            registry.connect(connection).await?;
        }
        Ok(registry)
    }

    /// Open the primary pool, and the replica when a read DSN is set
    pub async fn connect(&self, config: &ConnectionConfig) -> Result<(), DbError> {
        config
            .validate()
            .map_err(|e| DbError::Config(e.to_string()))?;

        let pool = DbPool::connect(config, &config.dsn).await?;
        self.register(&config.name, pool)?;

        if let Some(read_dsn) = config.read_dsn.as_deref().filter(|dsn| !dsn.trim().is_empty()) {
            let replica = DbPool::connect(config, read_dsn).await?;
            self.register(&config.read_name(), replica)?;
        }

        info!(
            connection = %config.name,
            driver = %config.driver(),
            replica = config.read_dsn.is_some(),
            "connection registered"
        );
        Ok(())
    }

    /// Register an already-open pool. Replaces any pool with the same name.
    pub fn register(&self, name: &str, pool: DbPool) -> Result<(), DbError> {
        if name.trim().is_empty() {
            return Err(DbError::Config("connection name cannot be empty".to_string()));
        }
        let mut pools = self
            .pools
            .write()
            .map_err(|_| DbError::Config("connection registry poisoned".to_string()))?;
        pools.insert(name.to_string(), pool);
        Ok(())
    }

    /// Primary pool for `name`
    pub fn get(&self, name: &str) -> Result<DbPool, DbError> {
        self.lookup(name)?
            .ok_or_else(|| DbError::Config(format!("unknown connection '{}'", name)))
    }

    /// Read replica for `name`, if one is registered
    pub fn read(&self, name: &str) -> Option<DbPool> {
        self.lookup(&read_connection_name(name)).ok().flatten()
    }

    pub fn driver(&self, name: &str) -> Result<Driver, DbError> {
        Ok(self.get(name)?.driver())
    }

    pub fn contains(&self, name: &str) -> bool {
        matches!(self.lookup(name), Ok(Some(_)))
    }

    pub fn names(&self) -> Vec<String> {
        self.pools
            .read()
            .map(|pools| pools.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Close and forget every pool
    pub async fn close(&self) {
        let pools: Vec<DbPool> = match self.pools.write() {
            Ok(mut pools) => pools.drain().map(|(_, pool)| pool).collect(),
            Err(_) => return,
        };
        for pool in pools {
            pool.close().await;
        }
    }

    fn lookup(&self, name: &str) -> Result<Option<DbPool>, DbError> {
        let pools = self
            .pools
            .read()
            .map_err(|_| DbError::Config("connection registry poisoned".to_string()))?;
        Ok(pools.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config(name: &str) -> ConnectionConfig {
        ConnectionConfig::new(name, "sqlite::memory:")
            .with_max_open_conns(1)
            .with_max_idle_conns(1)
    }

    #[tokio::test]
    async fn test_connect_and_lookup() {
        let registry = Registry::new();
        registry.connect(&memory_config("default")).await.unwrap();

        assert!(registry.contains("default"));
        assert_eq!(registry.driver("default").unwrap(), Driver::Sqlite);
        assert!(registry.read("default").is_none());

        let err = registry.get("missing").unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }

    #[tokio::test]
    async fn test_read_replica_registered() {
        let registry = Registry::new();
        let config = memory_config("main").with_read_dsn("sqlite::memory:");
        registry.connect(&config).await.unwrap();

        assert!(registry.read("main").is_some());
        assert!(registry.contains("main_read"));
    }

    #[tokio::test]
    async fn test_invalid_descriptor_rejected() {
        let registry = Registry::new();
        let config = memory_config("bad").with_max_idle_conns(5);
        assert!(matches!(
            registry.connect(&config).await,
            Err(DbError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_close_forgets_pools() {
        let registry = Registry::new();
        registry.connect(&memory_config("default")).await.unwrap();
        registry.close().await;
        assert!(registry.names().is_empty());
    }
}
