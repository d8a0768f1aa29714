//! Error types for the Tablehaus crate
//!
//! This module contains the error returned while assembling a [`crate::TableHaus`].

use cache_system::CacheError;
use config::ConfigError;
use store_object::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableHausError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}
