//! Per-field value transforms
//!
//! A hook rewrites one field on the way into the database (`input`) and on
//! the way out (`output`). Hooks only run for fields present in the record.

use crate::errors::DbError;
use std::fmt::{Debug, Write};
use type_mapping::{Record, Value};

/// Bidirectional transform for a single field
pub trait HookData: Send + Sync + Debug {
    /// Storage form of `value`. `record` is the full pending write.
    fn input(&self, record: &Record, value: Value) -> Result<Value, DbError>;

    /// Caller-facing form of `value`. `record` is the decoded row.
    fn output(&self, record: &Record, value: Value) -> Result<Value, DbError>;
}

/// JSON document stored as text. Reads yield an array or an object.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonHook;

/// Like [`JsonHook`] but an empty column reads as `[]`
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayHook;

/// Like [`JsonHook`] but an empty column reads as `{}`
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectHook;

/// `[1, 2, 3]` stored as `"1,2,3"`
#[derive(Debug, Clone, Copy, Default)]
pub struct CommaIntHook;

/// `["a", "b"]` stored as `"a,b"`
#[derive(Debug, Clone, Copy, Default)]
pub struct CommaStringHook;

/// Timestamps read back as formatted text
#[derive(Debug, Clone)]
pub struct TimeHook {
    /// chrono format string
    pub format: String,
}

pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl TimeHook {
    pub fn new(format: impl Into<String>) -> Self {
        let format = format.into();
        Self {
            format: if format.is_empty() {
                DEFAULT_TIME_FORMAT.to_string()
            } else {
                format
            },
        }
    }
}

impl Default for TimeHook {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_FORMAT)
    }
}

fn json_text(field: &str, value: Value) -> Result<Value, DbError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let text = serde_json::to_string_pretty(&value.to_json())
        .map_err(|e| DbError::hook(field, e.to_string()))?;
    Ok(Value::String(text))
}

// Whole-line `//` comments are allowed in stored documents
fn strip_line_comments(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text of a stored value, `None` when empty or NULL
fn stored_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        other => other.to_text(),
    };
    (!text.trim().is_empty()).then_some(text)
}

fn parse_document(field: &str, text: &str) -> Result<serde_json::Value, DbError> {
    serde_json::from_str(&strip_line_comments(text))
        .map_err(|e| DbError::hook(field, format!("invalid JSON: {}", e)))
}

impl HookData for JsonHook {
    fn input(&self, _record: &Record, value: Value) -> Result<Value, DbError> {
        json_text("json", value)
    }

    fn output(&self, _record: &Record, value: Value) -> Result<Value, DbError> {
        if let Value::Json(doc) = value {
            return Ok(Value::Json(doc));
        }
        let Some(text) = stored_text(&value) else {
            return Ok(Value::Null);
        };
        match parse_document("json", &text)? {
            doc @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => Ok(Value::Json(doc)),
            _ => Err(DbError::hook("json", "expected a JSON array or object")),
        }
    }
}

impl HookData for ArrayHook {
    fn input(&self, _record: &Record, value: Value) -> Result<Value, DbError> {
        json_text("array", value)
    }

    fn output(&self, _record: &Record, value: Value) -> Result<Value, DbError> {
        if let Value::Json(doc @ serde_json::Value::Array(_)) = value {
            return Ok(Value::Json(doc));
        }
        let Some(text) = stored_text(&value) else {
            return Ok(Value::Json(serde_json::Value::Array(Vec::new())));
        };
        match parse_document("array", &text)? {
            doc @ serde_json::Value::Array(_) => Ok(Value::Json(doc)),
            _ => Err(DbError::hook("array", "expected a JSON array")),
        }
    }
}

impl HookData for ObjectHook {
    fn input(&self, _record: &Record, value: Value) -> Result<Value, DbError> {
        json_text("object", value)
    }

    fn output(&self, _record: &Record, value: Value) -> Result<Value, DbError> {
        if let Value::Json(doc @ serde_json::Value::Object(_)) = value {
            return Ok(Value::Json(doc));
        }
        let Some(text) = stored_text(&value) else {
            return Ok(Value::Json(serde_json::Value::Object(Default::default())));
        };
        match parse_document("object", &text)? {
            doc @ serde_json::Value::Object(_) => Ok(Value::Json(doc)),
            _ => Err(DbError::hook("object", "expected a JSON object")),
        }
    }
}

/// Join a JSON list into comma-separated text; other values pass through
fn join_list(value: Value) -> Value {
    match value {
        Value::Json(serde_json::Value::Array(items)) => Value::String(
            items
                .iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => other,
    }
}

fn split_list(value: &Value) -> Vec<String> {
    stored_text(value)
        .map(|text| {
            text.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl HookData for CommaIntHook {
    fn input(&self, _record: &Record, value: Value) -> Result<Value, DbError> {
        Ok(join_list(value))
    }

    fn output(&self, _record: &Record, value: Value) -> Result<Value, DbError> {
        let items = split_list(&value)
            .into_iter()
            .map(|part| {
                part.parse::<i64>()
                    .map(serde_json::Value::from)
                    .map_err(|_| DbError::hook("comma_int", format!("'{}' is not an integer", part)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Json(serde_json::Value::Array(items)))
    }
}

impl HookData for CommaStringHook {
    fn input(&self, _record: &Record, value: Value) -> Result<Value, DbError> {
        Ok(join_list(value))
    }

    fn output(&self, _record: &Record, value: Value) -> Result<Value, DbError> {
        let items = split_list(&value)
            .into_iter()
            .map(serde_json::Value::String)
            .collect();
        Ok(Value::Json(serde_json::Value::Array(items)))
    }
}

impl HookData for TimeHook {
    fn input(&self, _record: &Record, value: Value) -> Result<Value, DbError> {
        Ok(value)
    }

    fn output(&self, _record: &Record, value: Value) -> Result<Value, DbError> {
        match value {
            Value::Timestamp(ts) => {
                // `to_string` would panic on a bad format string
                let mut text = String::new();
                write!(text, "{}", ts.format(&self.format)).map_err(|_| {
                    DbError::hook("time", format!("invalid time format '{}'", self.format))
                })?;
                Ok(Value::String(text))
            }
            other => Ok(other),
        }
    }
}
