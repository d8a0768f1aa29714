//! Records: one decoded row keyed by column name

use crate::types::Value;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};

/// Column name to value map for a single row.
///
/// Backed by a `BTreeMap` so field lists derived from a record come out in a
/// stable order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.0.get_mut(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    /// Chained insert
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.values()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }

    /// Text of a field; missing and null fields give an empty string
    pub fn get_string(&self, field: &str) -> String {
        self.get(field).map(Value::to_text).unwrap_or_default()
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_i64)
    }

    pub fn get_u64(&self, field: &str) -> Option<u64> {
        self.get(field).and_then(Value::as_u64)
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(Value::as_bool)
    }

    pub fn get_time(&self, field: &str) -> Option<DateTime<Utc>> {
        self.get(field).and_then(Value::as_timestamp)
    }

    pub fn get_decimal(&self, field: &str) -> Option<Decimal> {
        self.get(field).and_then(Value::as_decimal)
    }

    /// Structured view of a field. JSON text is parsed.
    pub fn get_json(&self, field: &str) -> Option<serde_json::Value> {
        match self.get(field)? {
            Value::Json(v) => Some(v.clone()),
            Value::Null => None,
            other => match other.as_str() {
                Some(text) => serde_json::from_str(text).ok(),
                None => Some(other.to_json()),
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Deserialize the record into a typed struct
    pub fn binding<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_json())
    }
}

impl From<BTreeMap<String, Value>> for Record {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Build a [`Record`] from `field => value` pairs
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };
    ($($field:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $(record.insert($field, $value);)+
        record
    }};
}

/// Single-row result paired with its error, for callers that predate `Result`
#[derive(Debug, Default)]
pub struct Row<E> {
    pub data: Record,
    pub err: Option<E>,
}

/// Multi-row counterpart of [`Row`]
#[derive(Debug, Default)]
pub struct Rows<E> {
    pub list: Vec<Record>,
    pub err: Option<E>,
}

impl<E> Row<E> {
    pub fn into_result(self) -> Result<Record, E> {
        match self.err {
            Some(err) => Err(err),
            None => Ok(self.data),
        }
    }

    pub fn binding<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        self.data.binding()
    }
}

impl<E> From<Result<Record, E>> for Row<E> {
    fn from(result: Result<Record, E>) -> Self {
        match result {
            Ok(data) => Row { data, err: None },
            Err(err) => Row {
                data: Record::new(),
                err: Some(err),
            },
        }
    }
}

impl<E> Rows<E> {
    pub fn into_result(self) -> Result<Vec<Record>, E> {
        match self.err {
            Some(err) => Err(err),
            None => Ok(self.list),
        }
    }

    pub fn binding<T: DeserializeOwned>(&self) -> Result<Vec<T>, serde_json::Error> {
        self.list.iter().map(Record::binding).collect()
    }
}

impl<E> From<Result<Vec<Record>, E>> for Rows<E> {
    fn from(result: Result<Vec<Record>, E>) -> Self {
        match result {
            Ok(list) => Rows { list, err: None },
            Err(err) => Rows {
                list: Vec::new(),
                err: Some(err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: i64,
        name: String,
        tags: Vec<String>,
    }

    #[test]
    fn test_record_macro_and_accessors() {
        let record = record! {
            "id" => 5,
            "name" => "alice",
            "score" => "12.5",
            "deleted" => Value::Null,
        };

        assert_eq!(record.get_i64("id"), Some(5));
        assert_eq!(record.get_string("name"), "alice");
        assert_eq!(record.get_f64("score"), Some(12.5));
        assert_eq!(record.get_string("deleted"), "");
        assert_eq!(record.get_string("missing"), "");
        assert_eq!(record.keys().collect::<Vec<_>>(), ["deleted", "id", "name", "score"]);
    }

    #[test]
    fn test_record_json_shape_is_flat() {
        let record = record! { "id" => 1, "name" => "a" };
        assert_eq!(serde_json::to_value(&record).unwrap(), json!({"id": 1, "name": "a"}));

        let parsed: Record = serde_json::from_str(r#"{"id": 1, "meta": {"k": "v"}}"#).unwrap();
        assert_eq!(parsed.get("meta"), Some(&Value::Json(json!({"k": "v"}))));
    }

    #[test]
    fn test_binding_into_struct() {
        let record = record! {
            "id" => 9,
            "name" => "bob",
            "tags" => Value::Json(json!(["a", "b"])),
        };
        let user: User = record.binding().unwrap();
        assert_eq!(user.tags, vec!["a".to_string(), "b".to_string()]);

        let row: Row<String> = Ok(record).into();
        assert_eq!(row.binding::<User>().unwrap().id, 9);
    }

    #[test]
    fn test_legacy_wrappers_carry_errors() {
        let rows: Rows<String> = Err("boom".to_string()).into();
        assert!(rows.list.is_empty());
        assert_eq!(rows.into_result().unwrap_err(), "boom");
    }

    #[test]
    fn test_get_json_parses_text() {
        let record = record! { "meta" => r#"{"a":1}"# };
        assert_eq!(record.get_json("meta"), Some(json!({"a": 1})));
    }
}
