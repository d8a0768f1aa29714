//! Row cache
//!
//! Rows are cached as tagged JSON under `{table}:{pk}:{id}`, so a hit decodes
//! to the same values as a miss. A secondary cache key maps
//! `{table}:{field}:{value}` to the primary-key text; a mapping whose row no
//! longer carries that value is dropped on read. Cache failures are logged
//! and never fail the operation; a bound transaction bypasses reads.

use super::Model;
use crate::errors::DbError;
use crate::query_builder::{QueryBuilder, QueryFilter, QueryOperator};
use cache_system::Cache;
use std::sync::Arc;
use tracing::warn;
use type_mapping::{Record, Value};

/// Primary-key text read back from the cache
fn key_value(text: &str) -> Value {
    match text.parse::<i64>() {
        Ok(id) => Value::Int(id),
        Err(_) => Value::String(text.to_string()),
    }
}

impl Model {
    fn row_key(&self, id: &Value) -> String {
        format!(
            "{}:{}:{}",
            self.config.table,
            self.config.primary_key,
            id.to_text()
        )
    }

    fn field_key(&self, field: &str, value: &Value) -> String {
        format!("{}:{}:{}", self.config.table, field, value.to_text())
    }

    /// Cache usable for reads
    fn read_cache(&self) -> Option<&Arc<dyn Cache>> {
        self.cache().filter(|_| self.scope.tx.is_none())
    }

    /// Row by primary key, read through the cache
    pub async fn find_by_id(&self, id: impl Into<Value>) -> Result<Record, DbError> {
        let id = id.into();
        self.bound()?;
        let Some(cache) = self.read_cache() else {
            return self.first(QueryBuilder::new().where_eq(&self.config.primary_key, id)).await;
        };

        let key = self.row_key(&id);
        match cache.get(&key).await {
            Ok(text) => match Record::from_tagged_json(&text) {
                Ok(record) => {
                    crate::debug_log!(key = %key, "cache hit");
                    return Ok(record);
                }
                Err(err) => warn!(key = %key, error = %err, "discarding unreadable cache entry"),
            },
            Err(err) if err.is_not_found() => {}
            Err(err) => warn!(key = %key, error = %err, "cache read failed"),
        }

        let record = self
            .first(QueryBuilder::new().where_eq(&self.config.primary_key, id))
            .await?;
        self.store(cache.as_ref(), &key, &record).await;
        Ok(record)
    }

    /// Row by `field = value`. Fields listed in the cache keys are read
    /// through the secondary mapping.
    pub async fn find_by_field(
        &self,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<Record, DbError> {
        let value = value.into();
        if field == self.config.primary_key {
            return self.find_by_id(value).await;
        }
        self.bound()?;

        let cache = self
            .read_cache()
            .filter(|_| self.config.cache_keys.iter().any(|k| k == field));
        let Some(cache) = cache else {
            return self.first(QueryBuilder::new().where_eq(field, value)).await;
        };

        let mapping = self.field_key(field, &value);
        match cache.get(&mapping).await {
            Ok(id) => match self.find_by_id(key_value(&id)).await {
                Ok(record) if holds(&record, field, &value) => return Ok(record),
                Ok(_) | Err(DbError::NotFound) => {
                    crate::debug_log!(key = %mapping, "stale cache mapping");
                    delete(cache.as_ref(), &mapping).await;
                }
                Err(err) => return Err(err),
            },
            Err(err) if err.is_not_found() => {}
            Err(err) => warn!(key = %mapping, error = %err, "cache read failed"),
        }

        let record = self.first(QueryBuilder::new().where_eq(field, value)).await?;
        if let Some(id) = record.get(&self.config.primary_key).filter(|id| !id.is_null()) {
            if let Err(err) = cache.set(&mapping, &id.to_text()).await {
                warn!(key = %mapping, error = %err, "cache write failed");
            }
            self.store(cache.as_ref(), &self.row_key(id), &record).await;
        }
        Ok(record)
    }

    async fn store(&self, cache: &dyn Cache, key: &str, record: &Record) {
        let text = match record.to_tagged_json() {
            Ok(text) => text,
            Err(err) => {
                warn!(key, error = %err, "cannot serialize row for cache");
                return;
            }
        };
        if let Err(err) = cache.set(key, &text).await {
            warn!(key, error = %err, "cache write failed");
        }
    }

    /// Drop cached rows addressed by top-level `=` or `in` conditions on the
    /// primary key or a secondary cache key
    pub(crate) async fn invalidate(&self, query: &QueryBuilder) {
        let Some(cache) = self.cache() else {
            return;
        };

        for node in query.conditions() {
            let QueryFilter::Condition { condition, .. } = node else {
                continue;
            };
            if !matches!(condition.operator, QueryOperator::Eq | QueryOperator::In) {
                continue;
            }

            if condition.field == self.config.primary_key {
                self.invalidate_ids(&condition.values).await;
            } else if self.config.cache_keys.contains(&condition.field) {
                for value in &condition.values {
                    let mapping = self.field_key(&condition.field, value);
                    match cache.get(&mapping).await {
                        Ok(id) => self.invalidate_ids(&[key_value(&id)]).await,
                        Err(err) if err.is_not_found() => {}
                        Err(err) => warn!(key = %mapping, error = %err, "cache read failed"),
                    }
                    delete(cache.as_ref(), &mapping).await;
                }
            }
        }
    }

    pub(crate) async fn invalidate_ids(&self, ids: &[Value]) {
        let Some(cache) = self.cache() else {
            return;
        };
        for id in ids.iter().filter(|id| !id.is_null()) {
            let key = self.row_key(id);
            if !self.config.cache_keys.is_empty() {
                self.drop_mappings(cache.as_ref(), &key).await;
            }
            delete(cache.as_ref(), &key).await;
        }
    }

    /// Remove the secondary mappings recorded for the cached row at `key`
    async fn drop_mappings(&self, cache: &dyn Cache, key: &str) {
        let row = match cache.get(key).await {
            Ok(text) => match Record::from_tagged_json(&text) {
                Ok(row) => row,
                Err(_) => return,
            },
            Err(err) if err.is_not_found() => return,
            Err(err) => {
                warn!(key, error = %err, "cache read failed");
                return;
            }
        };
        for field in &self.config.cache_keys {
            if let Some(value) = row.get(field).filter(|value| !value.is_null()) {
                delete(cache, &self.field_key(field, value)).await;
            }
        }
    }
}

/// Whether `record` still carries `value` in `field`
fn holds(record: &Record, field: &str, value: &Value) -> bool {
    record
        .get(field)
        .is_some_and(|current| current.to_text() == value.to_text())
}

async fn delete(cache: &dyn Cache, key: &str) {
    match cache.del(key).await {
        Ok(()) => {
            crate::debug_log!(key, "cache entry removed");
        }
        Err(err) => warn!(key, error = %err, "cache delete failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_value_parses_integers() {
        assert_eq!(key_value("42"), Value::Int(42));
        assert_eq!(key_value("-7"), Value::Int(-7));
        assert_eq!(key_value("a1"), Value::from("a1"));
    }

    #[test]
    fn test_holds_compares_text() {
        let row = Record::new().with("email", "a@x").with("code", 12);
        assert!(holds(&row, "email", &Value::from("a@x")));
        assert!(holds(&row, "code", &Value::UInt(12)));
        assert!(!holds(&row, "email", &Value::from("b@x")));
        assert!(!holds(&row, "missing", &Value::from("a@x")));
    }
}
