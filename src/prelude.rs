//! Convenience re-exports for common Tablehaus usage
//!
//! This prelude module re-exports the most commonly used items from the Tablehaus workspace,
//! making it easier to import everything you need with a single use statement.
//!
//! # Example
//!
//! ```rust
//! use tablehaus::prelude::*;
//!
//! let query = QueryBuilder::new().where_eq("status", 1).order_by_desc("id");
//! assert!(query.has_field_in_where("status"));
//! ```

// Core Tablehaus components
pub use crate::core::TableHaus;
pub use crate::errors::TableHausError;

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, ConnectionConfig, Driver};

// Re-export commonly used store-object types for convenience
pub use store_object::prelude::*;

// Re-export cache system
pub use cache_system::prelude::*;

// Common external dependencies
pub use anyhow;
pub use sqlx;
pub use tokio;
