//! Read operations

use super::Model;
use crate::errors::DbError;
use crate::executor::ExecResult;
use crate::query_builder::{LogicalOperator, Page, QueryBuilder, QueryFilter};
use type_mapping::{Record, Row, Rows, Value};

impl Model {
    /// Query options addressed at this table with the soft-delete filter applied
    pub(crate) fn read_query(&self, query: QueryBuilder) -> QueryBuilder {
        let mut query = self.scoped(query);
        if let Some(field) = &self.config.soft_delete {
            if query
                .conditions
                .iter()
                .any(|node| node.logic() == LogicalOperator::Or)
            {
                let conditions = std::mem::take(&mut query.conditions);
                query = query.filter(QueryFilter::group(conditions));
            }
            query = query.where_eq(field, 0);
        }
        query
    }

    /// Matching rows with relations expanded and read hooks applied.
    /// No match yields an empty list.
    pub async fn select(&self, query: QueryBuilder) -> Result<Vec<Record>, DbError> {
        self.bound()?;
        let (sql, args) = self.read_query(query).build_select();
        let mut rows = self.fetch("select", &sql, &args, true).await?;
        if rows.is_empty() {
            return Ok(rows);
        }

        for relation in &self.config.relations {
            relation.expand(self, &mut rows).await?;
        }
        self.apply_output(&mut rows)?;

        if let Some(field) = &self.config.soft_delete {
            for row in rows.iter_mut() {
                row.remove(field);
            }
        }
        Ok(rows)
    }

    /// First matching row or [`DbError::NotFound`]
    pub async fn first(&self, query: QueryBuilder) -> Result<Record, DbError> {
        self.select(query.limit(1))
            .await?
            .into_iter()
            .next()
            .ok_or(DbError::NotFound)
    }

    /// Alias of [`Model::first`]
    pub async fn single(&self, query: QueryBuilder) -> Result<Record, DbError> {
        self.first(query).await
    }

    pub async fn select_one(&self, query: QueryBuilder) -> Row<DbError> {
        self.first(query).await.into()
    }

    pub async fn rows(&self, query: QueryBuilder) -> Rows<DbError> {
        self.select(query).await.into()
    }

    /// Number of matching rows. Projection, ordering and paging are ignored.
    pub async fn count(&self, query: QueryBuilder) -> Result<i64, DbError> {
        self.bound()?;
        let mut query = query.without_pagination();
        query.order_by.clear();
        let (sql, args) = self.read_query(query.aggregate_count("*")).build_select();

        let rows = self.fetch("count", &sql, &args, true).await?;
        Ok(rows
            .first()
            .and_then(|row| row.get_i64("count"))
            .unwrap_or(0))
    }

    /// One 1-based page plus the total of the unpaged query
    pub async fn page(&self, page: u64, size: u64, query: QueryBuilder) -> Result<Page, DbError> {
        let total = self.count(query.clone()).await?;
        let list = if total == 0 {
            Vec::new()
        } else {
            self.select(query.pagination(page, size)).await?
        };
        Ok(Page { total, list })
    }

    /// Raw row-returning statement with `?` placeholders. Runs on the bound
    /// transaction or the primary; no hooks apply.
    pub async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Record>, DbError> {
        self.on_primary().fetch("query", sql, args, true).await
    }

    /// Raw statement with `?` placeholders. Runs on the bound transaction or
    /// the primary.
    pub async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult, DbError> {
        self.execute("exec", sql, args).await
    }
}
