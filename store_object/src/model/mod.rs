//! Dynamic table models
//!
//! A [`Model`] is bound to one table on one named connection. It is built
//! once and is cheap to clone; scoping calls such as [`Model::with_tx`]
//! return a new handle and leave the original untouched.
//!
//! A model whose configuration could not be resolved is *unbound*: every
//! operation returns the stored [`DbError::Config`].

mod builder;
mod cache;
mod relation;
mod select;
mod transaction;
mod write;

pub use builder::{ModelBuilder, DEFAULT_CONNECTION, DEFAULT_PRIMARY_KEY};
pub use relation::{Relation, RelationKind};

use crate::dialect::Dialect;
use crate::errors::DbError;
use crate::executor::{DbPool, ExecResult, TxHandle};
use crate::hooks::HookData;
use crate::logging::log_statement;
use crate::query_builder::QueryBuilder;
use crate::validation::validate_identifier;
use crate::validators::Validator;
use cache_system::Cache;
use config::Driver;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use type_mapping::{Record, Value};

pub(crate) struct ModelConfig {
    pub(crate) table: String,
    pub(crate) database: Option<String>,
    pub(crate) connection: String,
    pub(crate) primary_key: String,
    pub(crate) soft_delete: Option<String>,
    pub(crate) cache_keys: Vec<String>,
    pub(crate) cache: Option<Arc<dyn Cache>>,
    pub(crate) hooks: BTreeMap<String, Arc<dyn HookData>>,
    pub(crate) validators: Vec<Arc<dyn Validator>>,
    pub(crate) relations: Vec<Relation>,
}

#[derive(Clone)]
pub(crate) struct Bound {
    pub(crate) pool: DbPool,
    pub(crate) read_pool: Option<DbPool>,
    pub(crate) dialect: &'static dyn Dialect,
}

#[derive(Clone)]
pub(crate) struct Scope {
    tx: Option<TxHandle>,
    cancel: Option<CancellationToken>,
    timeout: Option<Duration>,
    validate: bool,
    /// Skip the read replica
    primary: bool,
}

impl Default for Scope {
    fn default() -> Self {
        Self {
            tx: None,
            cancel: None,
            timeout: None,
            validate: true,
            primary: false,
        }
    }
}

#[derive(Clone)]
pub struct Model {
    config: Arc<ModelConfig>,
    bound: Result<Bound, String>,
    scope: Scope,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("table", &self.config.table)
            .field("connection", &self.config.connection)
            .field("bound", &self.bound.is_ok())
            .field("in_transaction", &self.scope.tx.is_some())
            .field("has_cache", &self.config.cache.is_some())
            .finish()
    }
}

impl Model {
    pub fn builder(table: impl Into<String>) -> ModelBuilder {
        ModelBuilder::new(table)
    }

    pub fn table(&self) -> &str {
        &self.config.table
    }

    pub fn primary_key(&self) -> &str {
        &self.config.primary_key
    }

    pub fn connection(&self) -> &str {
        &self.config.connection
    }

    pub fn database(&self) -> Option<&str> {
        self.config.database.as_deref()
    }

    pub fn soft_delete_field(&self) -> Option<&str> {
        self.config.soft_delete.as_deref()
    }

    pub fn cache_key_fields(&self) -> &[String] {
        &self.config.cache_keys
    }

    pub fn is_bound(&self) -> bool {
        self.bound.is_ok()
    }

    pub fn driver(&self) -> Result<Driver, DbError> {
        Ok(self.bound()?.pool.driver())
    }

    /// Handle whose statements run inside `tx`
    pub fn with_tx(&self, tx: TxHandle) -> Model {
        let mut model = self.clone();
        model.scope.tx = Some(tx);
        model
    }

    /// Handle whose statements abort with [`DbError::Cancelled`] once `token` fires
    pub fn with_cancel(&self, token: CancellationToken) -> Model {
        let mut model = self.clone();
        model.scope.cancel = Some(token);
        model
    }

    /// Handle whose statements abort with [`DbError::Timeout`] after `limit`
    pub fn with_timeout(&self, limit: Duration) -> Model {
        let mut model = self.clone();
        model.scope.timeout = Some(limit);
        model
    }

    /// Handle that skips configured validators on writes
    pub fn without_validation(&self) -> Model {
        let mut model = self.clone();
        model.scope.validate = false;
        model
    }

    pub fn tx(&self) -> Option<&TxHandle> {
        self.scope.tx.as_ref()
    }

    fn on_primary(&self) -> Model {
        let mut model = self.clone();
        model.scope.primary = true;
        model
    }

    pub(crate) fn bound(&self) -> Result<&Bound, DbError> {
        self.bound
            .as_ref()
            .map_err(|message| DbError::Config(message.clone()))
    }

    pub(crate) fn cache(&self) -> Option<&Arc<dyn Cache>> {
        self.config.cache.as_ref()
    }

    /// Options addressed at this model's table
    fn scoped(&self, query: QueryBuilder) -> QueryBuilder {
        query
            .table(self.config.table.as_str())
            .database(self.config.database.clone().unwrap_or_default())
    }

    /// Abort `fut` on cancellation or timeout
    async fn guard<T>(&self, fut: impl Future<Output = Result<T, DbError>>) -> Result<T, DbError> {
        let limited = async {
            match self.scope.timeout {
                Some(limit) => match tokio::time::timeout(limit, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(DbError::Timeout),
                },
                None => fut.await,
            }
        };

        match &self.scope.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(DbError::Cancelled),
                result = limited => result,
            },
            None => limited.await,
        }
    }

    fn finished_tx() -> DbError {
        DbError::Config("transaction already finished".to_string())
    }

    /// Run a row-returning statement. Reads may use the replica.
    pub(crate) async fn fetch(
        &self,
        method: &'static str,
        sql: &str,
        args: &[Value],
        read: bool,
    ) -> Result<Vec<Record>, DbError> {
        let bound = self.bound()?;
        let converted = bound.dialect.convert_placeholders(sql);
        let started = Instant::now();

        let result = self
            .guard(async {
                match &self.scope.tx {
                    Some(handle) => {
                        let mut slot = handle.lock().await;
                        let tx = slot.as_mut().ok_or_else(Self::finished_tx)?;
                        tx.query(&converted, args).await
                    }
                    None => {
                        let replica = bound.read_pool.as_ref().filter(|_| read && !self.scope.primary);
                        match replica {
                            Some(pool) => pool.query(&converted, args).await,
                            None if read => bound.pool.query(&converted, args).await,
                            None => bound.pool.query_write(&converted, args).await,
                        }
                    }
                }
            })
            .await;

        log_statement(method, &self.config.table, started, sql, args, result.as_ref().err());
        result
    }

    /// Run a statement that returns no rows, on the primary
    pub(crate) async fn execute(
        &self,
        method: &'static str,
        sql: &str,
        args: &[Value],
    ) -> Result<ExecResult, DbError> {
        let bound = self.bound()?;
        let converted = bound.dialect.convert_placeholders(sql);
        let started = Instant::now();

        let result = self
            .guard(async {
                match &self.scope.tx {
                    Some(handle) => {
                        let mut slot = handle.lock().await;
                        let tx = slot.as_mut().ok_or_else(Self::finished_tx)?;
                        tx.execute(&converted, args).await
                    }
                    None => bound.pool.execute(&converted, args).await,
                }
            })
            .await;

        log_statement(method, &self.config.table, started, sql, args, result.as_ref().err());
        result
    }

    /// Apply input hooks to the fields present in `record`
    pub(crate) fn apply_input(&self, mut record: Record) -> Result<Record, DbError> {
        for (field, hook) in &self.config.hooks {
            if let Some(value) = record.get(field).cloned() {
                let value = hook.input(&record, value).map_err(|e| hook_error(e, field))?;
                record.insert(field.clone(), value);
            }
        }
        Ok(record)
    }

    /// Apply output hooks to the fields present in each row
    pub(crate) fn apply_output(&self, rows: &mut [Record]) -> Result<(), DbError> {
        for (field, hook) in &self.config.hooks {
            for row in rows.iter_mut() {
                if let Some(value) = row.get(field).cloned() {
                    let value = hook.output(row, value).map_err(|e| hook_error(e, field))?;
                    row.insert(field.clone(), value);
                }
            }
        }
        Ok(())
    }

    pub(crate) async fn run_validators(&self, record: &Record) -> Result<(), DbError> {
        if !self.scope.validate {
            return Ok(());
        }
        for validator in &self.config.validators {
            validator.validate(record, self).await?;
        }
        Ok(())
    }
}

/// Field names in a write are spliced into SQL
pub(crate) fn check_fields<'a>(fields: impl IntoIterator<Item = &'a String>) -> Result<(), DbError> {
    for field in fields {
        validate_identifier(field)?;
    }
    Ok(())
}

fn hook_error(err: DbError, field: &str) -> DbError {
    match err {
        DbError::Hook { message, .. } => DbError::Hook {
            field: field.to_string(),
            message,
        },
        other => other,
    }
}
