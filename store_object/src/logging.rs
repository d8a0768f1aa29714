//! Statement logging
//!
//! One `tracing` event per executed statement. The `debug-logging` feature
//! adds the statement with its arguments inlined.

use crate::errors::DbError;
use std::time::Instant;
use tracing::{debug, error};
use type_mapping::{render_sql, Value};

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

/// Statement with arguments inlined, only with `debug-logging`
fn full_sql(sql: &str, args: &[Value]) -> Option<String> {
    cfg!(feature = "debug-logging").then(|| render_sql(sql, args))
}

pub(crate) fn log_statement(
    method: &'static str,
    table: &str,
    started: Instant,
    sql: &str,
    args: &[Value],
    failure: Option<&DbError>,
) {
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let full_sql = full_sql(sql, args);

    match failure {
        Some(err) => error!(
            method,
            table,
            duration_ms,
            sql,
            args = args.len(),
            full_sql = full_sql.as_deref(),
            error = %err,
            "statement failed"
        ),
        None => debug!(
            method,
            table,
            duration_ms,
            sql,
            args = args.len(),
            full_sql = full_sql.as_deref(),
            "statement executed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_sql_follows_feature() {
        let rendered = full_sql("select * from users where id = ?", &[Value::Int(7)]);
        if cfg!(feature = "debug-logging") {
            assert_eq!(rendered.as_deref(), Some("select * from users where id = 7"));
        } else {
            assert!(rendered.is_none());
        }
    }
}
