//! JSON conversion for values
//!
//! Values serialize to their natural JSON form, which loses the variant:
//! timestamps and decimals come back as strings. Rows that must read back
//! exactly, such as cache entries, use the tagged form from
//! [`Record::to_tagged_json`].

use crate::record::Record;
use crate::types::Value;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::str::FromStr;

impl Value {
    /// JSON form of the value
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(v) => serde_json::Value::Bool(*v),
            Value::Int(v) => serde_json::Value::from(*v),
            Value::UInt(v) => serde_json::Value::from(*v),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => match std::str::from_utf8(b) {
                Ok(text) => serde_json::Value::String(text.to_string()),
                Err(_) => serde_json::Value::from(b.clone()),
            },
            Value::Timestamp(t) => serde_json::Value::String(t.to_rfc3339()),
            Value::Decimal(d) => serde_json::Value::String(d.to_string()),
            Value::Json(v) => v.clone(),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(val: serde_json::Value) -> Self {
        match val {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            other => Value::Json(other),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::UInt(v) => serializer.serialize_u64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::String(s) => serializer.serialize_str(s),
            Value::Timestamp(t) => serializer.serialize_str(&t.to_rfc3339()),
            Value::Decimal(d) => serializer.serialize_str(&d.to_string()),
            Value::Bytes(_) | Value::Json(_) => self.to_json().serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

/// Variant-preserving shape of a [`Value`]
#[derive(Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
enum Tagged {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Decimal(String),
    Json(serde_json::Value),
}

impl From<&Value> for Tagged {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Tagged::Null,
            Value::Bool(v) => Tagged::Bool(*v),
            Value::Int(v) => Tagged::Int(*v),
            Value::UInt(v) => Tagged::UInt(*v),
            Value::Float(v) => Tagged::Float(*v),
            Value::String(v) => Tagged::String(v.clone()),
            Value::Bytes(v) => Tagged::Bytes(v.clone()),
            Value::Timestamp(v) => Tagged::Timestamp(*v),
            Value::Decimal(v) => Tagged::Decimal(v.to_string()),
            Value::Json(v) => Tagged::Json(v.clone()),
        }
    }
}

impl TryFrom<Tagged> for Value {
    type Error = serde_json::Error;

    fn try_from(tagged: Tagged) -> Result<Self, Self::Error> {
        Ok(match tagged {
            Tagged::Null => Value::Null,
            Tagged::Bool(v) => Value::Bool(v),
            Tagged::Int(v) => Value::Int(v),
            Tagged::UInt(v) => Value::UInt(v),
            Tagged::Float(v) => Value::Float(v),
            Tagged::String(v) => Value::String(v),
            Tagged::Bytes(v) => Value::Bytes(v),
            Tagged::Timestamp(v) => Value::Timestamp(v),
            Tagged::Decimal(text) => Value::Decimal(
                Decimal::from_str(&text).map_err(serde::de::Error::custom)?,
            ),
            Tagged::Json(v) => Value::Json(v),
        })
    }
}

impl Record {
    /// Encode the row so that [`Record::from_tagged_json`] restores every
    /// value with its original variant
    pub fn to_tagged_json(&self) -> Result<String, serde_json::Error> {
        let tagged: BTreeMap<&str, Tagged> = self
            .iter()
            .map(|(field, value)| (field.as_str(), Tagged::from(value)))
            .collect();
        serde_json::to_string(&tagged)
    }

    pub fn from_tagged_json(text: &str) -> Result<Record, serde_json::Error> {
        let tagged: BTreeMap<String, Tagged> = serde_json::from_str(text)?;
        tagged
            .into_iter()
            .map(|(field, value)| Ok((field, Value::try_from(value)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use serde_json::json;

    #[test]
    fn test_natural_json_shapes() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(Value::Timestamp(ts).to_json(), json!("2024-01-02T03:04:05+00:00"));
        assert_eq!(Value::Decimal(Decimal::new(995, 2)).to_json(), json!("9.95"));
        assert_eq!(Value::Bytes(vec![0xff]).to_json(), json!([255]));
        assert_eq!(Value::Float(f64::NAN).to_json(), json!(null));
    }

    #[test]
    fn test_from_json_numbers() {
        assert_eq!(Value::from(json!(-3)), Value::Int(-3));
        assert_eq!(Value::from(json!(u64::MAX)), Value::UInt(u64::MAX));
        assert_eq!(Value::from(json!(1.5)), Value::Float(1.5));
        assert_eq!(Value::from(json!([1, 2])), Value::Json(json!([1, 2])));
    }

    #[test]
    fn test_serde_matches_to_json() {
        let value = Value::Json(json!({"a": [1, 2]}));
        let text = serde_json::to_string(&value).unwrap();
        assert_eq!(text, r#"{"a":[1,2]}"#);

        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_tagged_json_keeps_variants() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let record = Record::new()
            .with("id", 7)
            .with("big", Value::UInt(u64::MAX))
            .with("created", Value::Timestamp(ts))
            .with("price", Value::Decimal(Decimal::new(1250, 2)))
            .with("raw", Value::Bytes(vec![0xff, 0x00]))
            .with("name", "Ann")
            .with("profile", Value::Json(json!({"lang": "en"})))
            .with("deleted_at", Value::Null);

        let text = record.to_tagged_json().unwrap();
        assert_eq!(Record::from_tagged_json(&text).unwrap(), record);

        // the natural form does not survive
        let plain: Record = serde_json::from_str(&serde_json::to_string(&record).unwrap()).unwrap();
        assert_eq!(plain.get("created"), Some(&Value::from("2024-01-02T03:04:05+00:00")));
    }

    #[test]
    fn test_tagged_json_rejects_bad_decimal() {
        let text = r#"{"price":{"type":"decimal","value":"abc"}}"#;
        assert!(Record::from_tagged_json(text).is_err());
    }
}
