//! Core Tablehaus functionality
//!
//! This module contains the main TableHaus struct: it owns the connection
//! registry and the shared cache, and hands out models bound to them.

use std::sync::Arc;

use cache_system::{Cache, RedisCache};
use config::AppConfig;
use store_object::{Model, ModelBuilder, Registry};
use tracing::info;

use crate::errors::TableHausError;

/// Main Tablehaus coordinator that manages connections and the row cache
#[derive(Debug)]
pub struct TableHaus {
    registry: Registry,
    cache: Option<Arc<dyn Cache>>,
}

impl TableHaus {
    /// Connect every configured database and the cache, if one is configured
    pub async fn new(config: AppConfig) -> Result<Self, TableHausError> {
        config.validate()?;
        let registry = Registry::from_config(&config).await?;

        let cache = match config.cache.clone() {
            Some(cache_config) => Some(Arc::new(RedisCache::new(cache_config)?) as Arc<dyn Cache>),
            None => None,
        };

        info!(
            connections = config.connections.len(),
            cache = cache.is_some(),
            "tablehaus ready"
        );
        Ok(Self { registry, cache })
    }

    /// Assemble from an existing registry and cache
    pub fn from_parts(registry: Registry, cache: Option<Arc<dyn Cache>>) -> Self {
        Self { registry, cache }
    }

    /// Model builder for `table`, pre-wired with the shared cache
    pub fn model(&self, table: impl Into<String>) -> ModelBuilder {
        let builder = Model::builder(table);
        match &self.cache {
            Some(cache) => builder.cache(cache.clone()),
            None => builder,
        }
    }

    /// Resolve `builder` against the shared registry
    pub fn bind(&self, builder: ModelBuilder) -> Model {
        builder.build(&self.registry)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn cache(&self) -> Option<&Arc<dyn Cache>> {
        self.cache.as_ref()
    }

    /// Close every pool
    pub async fn close(&self) {
        self.registry.close().await;
        info!("tablehaus closed");
    }
}
