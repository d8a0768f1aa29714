//! Store Object - dynamic table models for Tablehaus
//!
//! This crate provides the query builder, the SQL dialects, the sqlx
//! execution layer and the [`Model`] façade that ties them together with
//! hooks, validators, soft delete and cache invalidation.

#[macro_use]
mod logging;

pub mod dialect;
pub mod errors;
pub mod executor;
pub mod hooks;
pub mod model;
pub mod prelude;
pub mod query_builder;
pub mod validation;
pub mod validators;

pub use dialect::{dialect_for, Dialect, MySqlDialect, PostgresDialect, SqliteDialect};
pub use errors::DbError;
pub use executor::{commit, rollback, DbPool, DbTransaction, ExecResult, Registry, TxHandle};
pub use hooks::{
    ArrayHook, CommaIntHook, CommaStringHook, HookData, JsonHook, ObjectHook, TimeHook,
};
pub use model::{Model, ModelBuilder, Relation, RelationKind};
pub use query_builder::{Page, QueryBuilder, QueryFilter, QueryOperator, SortOrder};
pub use validation::{validate_identifier, ValidationError};
pub use validators::{Required, Unique, Validator};

pub use type_mapping::{Record, Value};

pub type Row = type_mapping::Row<DbError>;
pub type Rows = type_mapping::Rows<DbError>;
