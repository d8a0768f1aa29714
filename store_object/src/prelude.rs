//! Convenience re-exports for common store-object usage

// Models
pub use crate::model::{Model, ModelBuilder, Relation, RelationKind};

// Execution
pub use crate::executor::{commit, rollback, ExecResult, Registry, TxHandle};

// Error types
pub use crate::errors::DbError;

// Query building
pub use crate::query_builder::{Page, QueryBuilder, QueryFilter, QueryOperator, SortOrder};

// Hooks and validators
pub use crate::hooks::HookData;
pub use crate::validators::{Required, Unique, Validator};

// Values
pub use type_mapping::{record, Record, Value};

// Common external dependencies that are frequently used
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
pub use tokio_util::sync::CancellationToken;
