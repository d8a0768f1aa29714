//! Write operations
//!
//! Every write runs input hooks and validators, then checks the field names
//! it is about to splice into SQL. Nothing is sent when any step fails.

use super::{check_fields, Model};
use crate::errors::DbError;
use crate::query_builder::{QueryBuilder, SqlGenerator};
use type_mapping::{Record, Value};

impl Model {
    /// Hooks then validators for one pending record
    async fn prepare(&self, record: Record) -> Result<Record, DbError> {
        let record = self.apply_input(record)?;
        self.run_validators(&record).await?;
        Ok(record)
    }

    /// Insert one row and return its generated key. A primary key in
    /// `record` is ignored.
    pub async fn insert(&self, record: Record) -> Result<i64, DbError> {
        let bound = self.bound()?;
        if record.is_empty() {
            return Err(DbError::Validation("insert record is empty".to_string()));
        }

        let mut record = self.prepare(record).await?;
        record.remove(&self.config.primary_key);
        if record.is_empty() {
            return Err(DbError::Validation(
                "insert record has no fields besides the primary key".to_string(),
            ));
        }
        check_fields(record.keys())?;

        let (fields, row): (Vec<String>, Vec<Value>) = record.into_iter().unzip();
        let (sql, args) = SqlGenerator::insert_rows(&self.scoped(QueryBuilder::new()), &fields, vec![row]);

        if bound.dialect.supports_last_insert_id() {
            let result = self.execute("insert", &sql, &args).await?;
            Ok(result.last_insert_id.unwrap_or(0))
        } else {
            let sql = bound.dialect.insert_returning(&sql, &self.config.primary_key);
            let rows = self.fetch("insert", &sql, &args, false).await?;
            Ok(rows
                .first()
                .and_then(|row| row.get_i64(&self.config.primary_key))
                .unwrap_or(0))
        }
    }

    /// Insert many rows in one statement and return the affected count. Every
    /// record must carry the same fields; a mismatch rejects the whole batch.
    pub async fn insert_batch(&self, records: Vec<Record>) -> Result<u64, DbError> {
        self.bound()?;
        if records.is_empty() {
            return Err(DbError::Validation("insert batch is empty".to_string()));
        }

        let mut prepared = Vec::with_capacity(records.len());
        for record in records {
            let mut record = self.prepare(record).await?;
            record.remove(&self.config.primary_key);
            prepared.push(record);
        }

        let fields: Vec<String> = prepared[0].keys().cloned().collect();
        if fields.is_empty() {
            return Err(DbError::Validation("insert record is empty".to_string()));
        }
        for (index, record) in prepared.iter().enumerate() {
            if record.len() != fields.len() || !fields.iter().all(|f| record.contains_key(f)) {
                return Err(DbError::Validation(format!(
                    "record {} does not match the fields of the first record",
                    index
                )));
            }
        }
        check_fields(&fields)?;

        let rows = prepared
            .into_iter()
            .map(|record| record.into_iter().map(|(_, value)| value).collect())
            .collect();
        let (sql, args) = SqlGenerator::insert_rows(&self.scoped(QueryBuilder::new()), &fields, rows);
        Ok(self.execute("insert_batch", &sql, &args).await?.rows_affected)
    }

    /// Insert unless the row conflicts with an existing key. Returns the
    /// affected count, 0 when the row was skipped.
    pub async fn insert_ignore(&self, record: Record) -> Result<u64, DbError> {
        self.bound()?;
        if record.is_empty() {
            return Err(DbError::Validation("insert record is empty".to_string()));
        }
        let record = self.prepare(record).await?;
        self.insert_ignore_prepared(record).await
    }

    async fn insert_ignore_prepared(&self, record: Record) -> Result<u64, DbError> {
        let bound = self.bound()?;
        check_fields(record.keys())?;
        let (fields, args): (Vec<String>, Vec<Value>) = record.into_iter().unzip();
        let table = self.scoped(QueryBuilder::new()).qualified_table();
        let sql = bound
            .dialect
            .insert_ignore(&table, &fields, &SqlGenerator::placeholders(fields.len()));
        Ok(self.execute("insert_ignore", &sql, &args).await?.rows_affected)
    }

    /// Insert, or update `update_fields` when the primary key already exists.
    /// With no fields named every non-key field is updated. Returns the row
    /// as stored together with the affected count.
    pub async fn insert_or_update(
        &self,
        record: Record,
        update_fields: &[&str],
    ) -> Result<(Record, u64), DbError> {
        let bound = self.bound()?;
        if record.is_empty() {
            return Err(DbError::Validation("insert record is empty".to_string()));
        }
        let pk = &self.config.primary_key;
        let mut record = self.prepare(record).await?;
        if record.get(pk).is_some_and(Value::is_null) {
            record.remove(pk);
        }
        check_fields(record.keys())?;

        let updates: Vec<String> = if update_fields.is_empty() {
            record.keys().filter(|f| *f != pk).cloned().collect()
        } else {
            update_fields
                .iter()
                .filter(|f| **f != pk.as_str() && record.contains_key(f))
                .map(|f| f.to_string())
                .collect()
        };

        let lookup = record.clone();
        let affected = if updates.is_empty() {
            self.insert_ignore_prepared(record).await?
        } else {
            let extra: Vec<Value> = updates
                .iter()
                .filter_map(|f| record.get(f).cloned())
                .collect();
            let (fields, mut args): (Vec<String>, Vec<Value>) = record.into_iter().unzip();
            let table = self.scoped(QueryBuilder::new()).qualified_table();
            let (sql, needs_values) = bound.dialect.upsert(
                &table,
                &fields,
                &SqlGenerator::placeholders(fields.len()),
                pk,
                &updates,
            );
            if needs_values {
                args.extend(extra);
            }
            self.execute("insert_or_update", &sql, &args).await?.rows_affected
        };

        let query = match lookup.get(pk).filter(|id| !id.is_null()) {
            Some(id) => QueryBuilder::new().where_eq(pk, id.clone()),
            None => lookup
                .iter()
                .fold(QueryBuilder::new(), |query, (field, value)| {
                    if value.is_null() {
                        query.where_null(field)
                    } else {
                        query.where_eq(field, value.clone())
                    }
                }),
        };
        let stored = self.on_primary().first(query).await?;
        if let Some(id) = stored.get(pk) {
            self.invalidate_ids(std::slice::from_ref(id)).await;
        }
        Ok((stored, affected))
    }

    /// Update matching rows and return the affected count. A primary key in
    /// `record` becomes a condition and is never written.
    pub async fn update(&self, record: Record, query: QueryBuilder) -> Result<u64, DbError> {
        self.bound()?;
        let pk = &self.config.primary_key;

        let mut query = query;
        if let Some(id) = record.get(pk).filter(|id| !id.is_null()) {
            if !query.has_field_in_where(pk) {
                query = query.where_eq(pk, id.clone());
            }
        }

        let mut record = self.prepare(record).await?;
        record.remove(pk);
        if record.is_empty() && query.updates().is_empty() {
            return Err(DbError::Validation("nothing to update".to_string()));
        }
        check_fields(record.keys())?;
        check_fields(query.updates().iter().map(|(field, _)| field))?;

        let pending = std::mem::take(&mut query.updates);
        let query = record
            .into_iter()
            .fold(self.scoped(query), |query, (field, value)| query.set(&field, value));
        let query = pending.into_iter().fold(query, |mut query, update| {
            query.updates.push(update);
            query
        });

        let (sql, args) = query.build_update();
        let result = self.execute("update", &sql, &args).await?;
        self.invalidate(&query).await;
        Ok(result.rows_affected)
    }

    /// Update the row whose primary key is `id`
    pub async fn update_by_id(&self, id: impl Into<Value>, record: Record) -> Result<u64, DbError> {
        let query = QueryBuilder::new().where_eq(&self.config.primary_key, id);
        self.update(record, query).await
    }

    /// Delete matching rows and return the affected count. At least one
    /// condition is required. With a soft-delete field the rows are flagged
    /// instead.
    pub async fn delete(&self, query: QueryBuilder) -> Result<u64, DbError> {
        self.bound()?;
        if !query.has_conditions() {
            return Err(DbError::Validation(
                "delete requires at least one condition".to_string(),
            ));
        }

        if let Some(field) = &self.config.soft_delete {
            let flag = Record::new().with(field.clone(), 1);
            return self.without_validation().update(flag, query).await;
        }

        let query = self.scoped(query);
        let (sql, args) = query.build_delete();
        let result = self.execute("delete", &sql, &args).await?;
        self.invalidate(&query).await;
        Ok(result.rows_affected)
    }

    /// Delete the row whose primary key is `id`
    pub async fn delete_by_id(&self, id: impl Into<Value>) -> Result<u64, DbError> {
        self.delete(QueryBuilder::new().where_eq(&self.config.primary_key, id))
            .await
    }
}
