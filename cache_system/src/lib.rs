//! Cache system for record caching
//!
//! This crate defines the `Cache` contract consumed by table models and
//! ships two backends: Redis for deployments and an in-process map for
//! tests and single-node tools.

pub mod errors;
pub mod manager;
pub mod memory;
pub mod prelude;

// Re-export centralized config
pub use config::CacheConfig;

pub use errors::CacheError;
pub use manager::RedisCache;
pub use memory::MemoryCache;

use async_trait::async_trait;
use std::fmt::Debug;

/// Key/value cache used for record invalidation and read-through.
///
/// `get` must report a missing key as [`CacheError::KeyNotFound`] so callers
/// can tell a miss apart from a backend failure.
#[async_trait]
pub trait Cache: Send + Sync + Debug {
    async fn get(&self, key: &str) -> Result<String, CacheError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

    async fn del(&self, key: &str) -> Result<(), CacheError>;
}
