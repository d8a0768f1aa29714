//! Write validators
//!
//! Validators see the pending record after input hooks have run and may
//! query the model. Any error aborts the write before SQL is sent.

use crate::errors::DbError;
use crate::model::Model;
use crate::query_builder::QueryBuilder;
use async_trait::async_trait;
use type_mapping::Record;

#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, record: &Record, model: &Model) -> Result<(), DbError>;
}

#[async_trait]
impl<F> Validator for F
where
    F: Fn(&Record, &Model) -> Result<(), DbError> + Send + Sync,
{
    async fn validate(&self, record: &Record, model: &Model) -> Result<(), DbError> {
        self(record, model)
    }
}

/// Fields that must be present and non-empty. A record without the field
/// passes, so partial updates are not rejected.
#[derive(Debug, Clone)]
pub struct Required(pub Vec<String>);

impl Required {
    pub fn new<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self(fields.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl Validator for Required {
    async fn validate(&self, record: &Record, _model: &Model) -> Result<(), DbError> {
        for field in &self.0 {
            if let Some(value) = record.get(field) {
                if value.is_null() || value.to_text().trim().is_empty() {
                    return Err(DbError::Validation(format!("{} is required", field)));
                }
            }
        }
        Ok(())
    }
}

/// Field value must not already exist on another row
#[derive(Debug, Clone)]
pub struct Unique(pub String);

impl Unique {
    pub fn new(field: impl Into<String>) -> Self {
        Self(field.into())
    }
}

#[async_trait]
impl Validator for Unique {
    async fn validate(&self, record: &Record, model: &Model) -> Result<(), DbError> {
        let Some(value) = record.get(&self.0) else {
            return Ok(());
        };
        if value.is_null() {
            return Ok(());
        }

        let mut query = QueryBuilder::new().where_eq(&self.0, value.clone());
        if let Some(id) = record.get(model.primary_key()).filter(|id| !id.is_null()) {
            query = query.where_ne(model.primary_key(), id.clone());
        }

        if model.count(query).await? > 0 {
            return Err(DbError::Validation(format!(
                "{} '{}' already exists",
                self.0, value
            )));
        }
        Ok(())
    }
}
