//! Related-row expansion

use super::Model;
use crate::errors::DbError;
use crate::query_builder::QueryBuilder;
use crate::validation::{validate_identifier, ValidationError};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use type_mapping::{Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// First matching row as an object, or null
    HasOne,
    /// Every matching row as an array
    HasMany,
}

/// Rows of `model` attached under `name` where `model.foreign_key = row.local_key`
#[derive(Debug, Clone)]
pub struct Relation {
    pub name: String,
    pub kind: RelationKind,
    pub model: Model,
    pub local_key: String,
    pub foreign_key: String,
}

type BoxedRows<'a> = Pin<Box<dyn Future<Output = Result<Vec<Record>, DbError>> + Send + 'a>>;

impl Relation {
    pub fn new(
        kind: RelationKind,
        name: impl Into<String>,
        model: Model,
        local_key: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            model,
            local_key: local_key.into(),
            foreign_key: foreign_key.into(),
        }
    }

    pub(crate) fn check(&self) -> Result<(), ValidationError> {
        validate_identifier(&self.name)?;
        validate_identifier(&self.local_key)?;
        validate_identifier(&self.foreign_key)
    }

    /// Attach related rows to `rows` with one query
    pub(crate) async fn expand(&self, parent: &Model, rows: &mut [Record]) -> Result<(), DbError> {
        let mut keys: Vec<Value> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for row in rows.iter() {
            if let Some(value) = row.get(&self.local_key).filter(|v| !v.is_null()) {
                if seen.insert(value.to_text()) {
                    keys.push(value.clone());
                }
            }
        }

        let mut grouped: HashMap<String, Vec<serde_json::Value>> = HashMap::new();
        if !keys.is_empty() {
            // The related query joins the caller's transaction and deadline
            let mut related = self.model.clone();
            related.scope = parent.scope.clone();
            let query = QueryBuilder::new().where_in(&self.foreign_key, keys);
            for found in select_boxed(&related, query).await? {
                if let Some(key) = found.get(&self.foreign_key) {
                    grouped
                        .entry(key.to_text())
                        .or_default()
                        .push(found.to_json());
                }
            }
        }

        for row in rows.iter_mut() {
            let matches = row
                .get(&self.local_key)
                .filter(|v| !v.is_null())
                .and_then(|key| grouped.get(&key.to_text()));
            let value = match self.kind {
                RelationKind::HasOne => matches
                    .and_then(|found| found.first().cloned())
                    .map(Value::Json)
                    .unwrap_or(Value::Null),
                RelationKind::HasMany => Value::Json(serde_json::Value::Array(
                    matches.cloned().unwrap_or_default(),
                )),
            };
            row.insert(self.name.clone(), value);
        }
        Ok(())
    }
}

// Relations may nest, so the recursive select is boxed
fn select_boxed(model: &Model, query: QueryBuilder) -> BoxedRows<'_> {
    Box::pin(model.select(query))
}
