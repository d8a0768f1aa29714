//! Model construction

use super::relation::{Relation, RelationKind};
use super::{Bound, Model, ModelConfig, Scope};
use crate::dialect::dialect_for;
use crate::executor::Registry;
use crate::hooks::{
    ArrayHook, CommaIntHook, CommaStringHook, HookData, JsonHook, ObjectHook, TimeHook,
};
use crate::validation::validate_identifier;
use crate::validators::Validator;
use cache_system::Cache;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const DEFAULT_CONNECTION: &str = "default";
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Options for a [`Model`]. `build` resolves the connection.
#[must_use]
pub struct ModelBuilder {
    table: String,
    connection: String,
    database: Option<String>,
    primary_key: String,
    soft_delete: Option<String>,
    cache_keys: Vec<String>,
    cache: Option<Arc<dyn Cache>>,
    hooks: BTreeMap<String, Arc<dyn HookData>>,
    validators: Vec<Arc<dyn Validator>>,
    relations: Vec<Relation>,
}

impl ModelBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            connection: DEFAULT_CONNECTION.to_string(),
            database: None,
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            soft_delete: None,
            cache_keys: Vec::new(),
            cache: None,
            hooks: BTreeMap::new(),
            validators: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn connection(mut self, name: impl Into<String>) -> Self {
        self.connection = name.into();
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        let database = database.into();
        self.database = (!database.is_empty()).then_some(database);
        self
    }

    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = field.into();
        self
    }

    /// Rows with `field = 1` are treated as deleted
    pub fn soft_delete(mut self, field: impl Into<String>) -> Self {
        self.soft_delete = Some(field.into());
        self
    }

    /// Secondary fields whose values can address a cached row
    pub fn cache_keys<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.cache_keys = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn hook(mut self, field: impl Into<String>, hook: impl HookData + 'static) -> Self {
        self.hooks.insert(field.into(), Arc::new(hook));
        self
    }

    pub fn json(self, field: impl Into<String>) -> Self {
        self.hook(field, JsonHook)
    }

    pub fn array(self, field: impl Into<String>) -> Self {
        self.hook(field, ArrayHook)
    }

    pub fn object(self, field: impl Into<String>) -> Self {
        self.hook(field, ObjectHook)
    }

    pub fn comma_int(self, field: impl Into<String>) -> Self {
        self.hook(field, CommaIntHook)
    }

    pub fn comma_string(self, field: impl Into<String>) -> Self {
        self.hook(field, CommaStringHook)
    }

    /// Format timestamps on read; an empty format uses `%Y-%m-%d %H:%M:%S`
    pub fn time(self, field: impl Into<String>, format: impl Into<String>) -> Self {
        self.hook(field, TimeHook::new(format))
    }

    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Attach the related row whose `foreign_key` equals this row's `local_key`
    pub fn has_one(
        mut self,
        name: impl Into<String>,
        model: Model,
        local_key: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.relations.push(Relation::new(
            RelationKind::HasOne,
            name,
            model,
            local_key,
            foreign_key,
        ));
        self
    }

    /// Attach every related row whose `foreign_key` equals this row's `local_key`
    pub fn has_many(
        mut self,
        name: impl Into<String>,
        model: Model,
        local_key: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.relations.push(Relation::new(
            RelationKind::HasMany,
            name,
            model,
            local_key,
            foreign_key,
        ));
        self
    }

    /// Resolve against `registry`. Never fails: a bad configuration yields a
    /// model whose every call returns the configuration error.
    pub fn build(self, registry: &Registry) -> Model {
        let bound = self.check().and_then(|_| {
            let pool = registry.get(&self.connection).map_err(|e| e.to_string())?;
            let read_pool = registry.read(&self.connection);
            let dialect = dialect_for(pool.driver());
            Ok(Bound {
                pool,
                read_pool,
                dialect,
            })
        });

        if let Err(message) = &bound {
            tracing::warn!(table = %self.table, connection = %self.connection, error = %message, "model is unbound");
        }

        Model {
            config: Arc::new(ModelConfig {
                table: self.table,
                database: self.database,
                connection: self.connection,
                primary_key: self.primary_key,
                soft_delete: self.soft_delete,
                cache_keys: self.cache_keys,
                cache: self.cache,
                hooks: self.hooks,
                validators: self.validators,
                relations: self.relations,
            }),
            bound,
            scope: Scope::default(),
        }
    }

    fn check(&self) -> Result<(), String> {
        if self.table.trim().is_empty() {
            return Err("table name is empty".to_string());
        }
        let names = std::iter::once(&self.table)
            .chain(self.database.iter())
            .chain(std::iter::once(&self.primary_key))
            .chain(self.soft_delete.iter())
            .chain(self.cache_keys.iter())
            .chain(self.hooks.keys());
        for name in names {
            validate_identifier(name).map_err(|e| e.to_string())?;
        }
        for relation in &self.relations {
            relation.check().map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}
