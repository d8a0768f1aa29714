//! Dynamic column values
//!
//! `Value` is the closed set of shapes a decoded column can take. Every
//! decode and bind path matches on it exhaustively.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Decimal(Decimal),
    /// Structured data exposed by read hooks
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
            Value::Decimal(_) => "decimal",
            Value::Json(_) => "json",
        }
    }

    /// Borrow the text of a `String` value, or UTF-8 bytes
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Lenient integer view: numbers, numeric strings and booleans
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            Value::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Value::Bool(v) => Some(i64::from(*v)),
            Value::Decimal(d) => d.to_i64(),
            Value::String(_) | Value::Bytes(_) => self.as_str()?.trim().parse().ok(),
            Value::Json(serde_json::Value::Number(n)) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            Value::Int(v) => u64::try_from(*v).ok(),
            Value::Decimal(d) => d.to_u64(),
            Value::String(_) | Value::Bytes(_) => self.as_str()?.trim().parse().ok(),
            _ => self.as_i64().and_then(|v| u64::try_from(v).ok()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::UInt(v) => Some(*v as f64),
            Value::Decimal(d) => d.to_f64(),
            Value::String(_) | Value::Bytes(_) => self.as_str()?.trim().parse().ok(),
            Value::Json(serde_json::Value::Number(n)) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::Int(v) => Some(*v != 0),
            Value::UInt(v) => Some(*v != 0),
            Value::String(_) | Value::Bytes(_) => match self.as_str()?.trim() {
                "1" | "true" | "TRUE" | "True" => Some(true),
                "0" | "false" | "FALSE" | "False" => Some(false),
                _ => None,
            },
            Value::Json(serde_json::Value::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    /// Timestamps, or RFC 3339 / `YYYY-MM-DD HH:MM:SS` text read as UTC
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            Value::String(_) | Value::Bytes(_) => parse_timestamp(self.as_str()?),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            Value::Int(v) => Some(Decimal::from(*v)),
            Value::UInt(v) => Some(Decimal::from(*v)),
            Value::Float(v) => Decimal::from_f64_retain(*v),
            Value::String(_) | Value::Bytes(_) => Decimal::from_str(self.as_str()?.trim()).ok(),
            _ => None,
        }
    }

    /// Text form used for cache keys and comma-joined lists. Null is empty.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::UInt(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::String(s) => s.clone(),
            Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            Value::Timestamp(t) => t.to_rfc3339(),
            Value::Decimal(d) => d.to_string(),
            Value::Json(serde_json::Value::String(s)) => s.clone(),
            Value::Json(v) => v.to_string(),
        }
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            other => f.write_str(&other.to_text()),
        }
    }
}

macro_rules! value_from {
    ($variant:ident: $($ty:ty),+) => {
        $(
            impl From<$ty> for Value {
                fn from(val: $ty) -> Self {
                    Value::$variant(val.into())
                }
            }
        )+
    };
}

value_from!(Int: i8, i16, i32, i64);
value_from!(UInt: u8, u16, u32, u64);
value_from!(Float: f32, f64);
value_from!(Bool: bool);
value_from!(String: String, &str);
value_from!(Bytes: Vec<u8>, &[u8]);
value_from!(Timestamp: DateTime<Utc>);
value_from!(Decimal: Decimal);

impl From<NaiveDateTime> for Value {
    fn from(val: NaiveDateTime) -> Self {
        Value::Timestamp(Utc.from_utc_datetime(&val))
    }
}

impl From<NaiveDate> for Value {
    fn from(val: NaiveDate) -> Self {
        Value::Timestamp(Utc.from_utc_datetime(&val.and_time(NaiveTime::MIN)))
    }
}

impl From<NaiveTime> for Value {
    // Time-of-day columns carry no date; anchor them on the Unix epoch
    fn from(val: NaiveTime) -> Self {
        let naive = NaiveDate::from_ymd_opt(1970, 1, 1)
            .unwrap_or_default()
            .and_time(val);
        Value::Timestamp(Utc.from_utc_datetime(&naive))
    }
}

impl From<Uuid> for Value {
    fn from(val: Uuid) -> Self {
        Value::String(val.to_string())
    }
}

impl From<&String> for Value {
    fn from(val: &String) -> Self {
        Value::String(val.clone())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(val: Option<T>) -> Self {
        match val {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_numeric_views() {
        assert_eq!(Value::String(" 42 ".into()).as_i64(), Some(42));
        assert_eq!(Value::UInt(7).as_i64(), Some(7));
        assert_eq!(Value::UInt(u64::MAX).as_i64(), None);
        assert_eq!(Value::Int(-1).as_u64(), None);
        assert_eq!(Value::Bool(true).as_i64(), Some(1));
        assert_eq!(Value::Null.as_i64(), None);
        assert_eq!(Value::Bytes(b"3.5".to_vec()).as_f64(), Some(3.5));
    }

    #[test]
    fn test_timestamp_parsing() {
        let parsed = Value::from("2024-03-01 10:20:30").as_timestamp().unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-01T10:20:30+00:00");

        let rfc = Value::from("2024-03-01T10:20:30+02:00").as_timestamp().unwrap();
        assert_eq!(rfc.to_rfc3339(), "2024-03-01T08:20:30+00:00");

        assert!(Value::from("yesterday").as_timestamp().is_none());
    }

    #[test]
    fn test_option_maps_to_null() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::String("a".into()));
    }

    #[test]
    fn test_text_forms() {
        assert_eq!(Value::Null.to_text(), "");
        assert_eq!(Value::Decimal(Decimal::new(1250, 2)).to_text(), "12.50");
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(
            Value::Json(serde_json::json!("plain")).to_text(),
            "plain"
        );
    }
}
