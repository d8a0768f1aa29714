//! # Tablehaus
//!
//! Dynamic, dialect-aware table models over sqlx for MySQL, PostgreSQL and
//! SQLite. Rows are plain [`Record`]s; a [`Model`] adds hooks, validators,
//! soft delete, read replicas and row-cache invalidation on top of a
//! composable [`QueryBuilder`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tablehaus::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig {
//!         connections: vec![ConnectionConfig::new("default", "mysql://root@localhost/app")],
//!         cache: None,
//!     };
//!     let haus = TableHaus::new(config).await?;
//!
//!     let users = haus.bind(haus.model("users").soft_delete("is_deleted").json("profile"));
//!
//!     let id = users
//!         .insert(record! { "name" => "Ann", "profile" => serde_json::json!({"lang": "en"}) })
//!         .await?;
//!     let user = users.find_by_id(id).await?;
//!     println!("{}", user.get_string("name"));
//!
//!     users.update(record! { "id" => id, "name" => "Anna" }, QueryBuilder::new()).await?;
//!     users.delete(QueryBuilder::new().where_eq("id", id)).await?;
//!
//!     haus.close().await;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod errors;
pub mod prelude;

// Re-export the main public types for convenience
pub use crate::core::TableHaus;
pub use errors::TableHausError;

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, ConnectionConfig, Driver};

pub use store_object::{
    DbError, Model, ModelBuilder, QueryBuilder, QueryFilter, Record, Registry, Value,
};
pub use store_object::{debug_log, trace_log};

// Re-export internal crates used by the public API
pub use cache_system;
pub use store_object;
pub use type_mapping;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
