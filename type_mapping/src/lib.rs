//! Dynamic value model shared across the tablehaus workspace
//!
//! Decoded rows are [`Record`]s of [`Value`]s. Column type names reported by
//! the drivers are mapped to a [`ColumnKind`] that selects how each cell is
//! extracted.

pub mod record;
pub mod serialize;
pub mod sql;
pub mod types;

pub use record::{Record, Row, Rows};
pub use sql::{
    decimal_from_text, render_sql, sql_literal, text_or_bytes, ColumnKind, FloatWidth, IntWidth,
    TemporalKind,
};
pub use types::Value;

pub use rust_decimal::Decimal;
