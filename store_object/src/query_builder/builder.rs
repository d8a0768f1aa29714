//! Query options accumulator
//!
//! Every setter consumes and returns the builder. Setters for independent
//! parts (projection, ordering, paging, locking) commute; condition setters
//! append in call order.

use crate::query_builder::filter::{QueryFilter, QueryOperator};
use crate::query_builder::ordering::SortOrder;
use crate::query_builder::pagination::page_offset;
use crate::query_builder::sql_generation::SqlGenerator;
use crate::query_builder::update::UpdateOperation;
use type_mapping::Value;

/// Query builder for constructing complex database queries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryBuilder {
    pub(crate) table: String,
    pub(crate) database: Option<String>,
    pub(crate) fields: Vec<String>,
    pub(crate) updates: Vec<(String, UpdateOperation)>,
    pub(crate) conditions: Vec<QueryFilter>,
    pub(crate) order_by: Vec<(String, SortOrder)>,
    pub(crate) group_by: Option<String>,
    pub(crate) limit: u64,
    pub(crate) offset: u64,
    pub(crate) for_update: bool,
}

macro_rules! where_pair {
    ($($and_name:ident, $or_name:ident => $ctor:ident;)+) => {
        $(
            pub fn $and_name(self, field: &str, value: impl Into<Value>) -> Self {
                self.filter(QueryFilter::$ctor(field, value))
            }

            pub fn $or_name(self, field: &str, value: impl Into<Value>) -> Self {
                self.filter(QueryFilter::$ctor(field, value).or())
            }
        )+
    };
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Qualify the table as `database.table`
    pub fn database(mut self, database: impl Into<String>) -> Self {
        let database = database.into();
        self.database = (!database.is_empty()).then_some(database);
        self
    }

    /// Replace the projection. `" AS "` aliases are normalized to `" as "`.
    pub fn fields<S: AsRef<str>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = fields
            .into_iter()
            .map(|f| f.as_ref().trim().replace(" AS ", " as "))
            .filter(|f| !f.is_empty())
            .collect();
        self
    }

    /// Append a projection expression verbatim
    pub fn field_raw(mut self, expression: impl Into<String>) -> Self {
        self.fields.push(expression.into());
        self
    }

    pub fn aggregate_count(self, field: &str) -> Self {
        self.fields([format!("count({}) as count", field)])
    }

    pub fn aggregate_sum(self, field: &str) -> Self {
        self.fields([format!("sum({}) as aggregate", field)])
    }

    pub fn aggregate_max(self, field: &str) -> Self {
        self.fields([format!("max({}) as aggregate", field)])
    }

    /// Assign a column in an update
    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.updates
            .push((field.to_string(), UpdateOperation::Set(value.into())));
        self
    }

    /// `field = field + delta` in an update
    pub fn increment(mut self, field: &str, delta: impl Into<Value>) -> Self {
        self.updates
            .push((field.to_string(), UpdateOperation::Increment(delta.into())));
        self
    }

    /// `field = field - delta` in an update
    pub fn decrement(mut self, field: &str, delta: impl Into<Value>) -> Self {
        self.updates
            .push((field.to_string(), UpdateOperation::Decrement(delta.into())));
        self
    }

    /// Append a condition node as-is
    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.conditions.push(filter);
        self
    }

    pub fn filters(mut self, filters: Vec<QueryFilter>) -> Self {
        self.conditions.extend(filters);
        self
    }

    pub fn where_op(self, field: &str, operator: QueryOperator, value: impl Into<Value>) -> Self {
        self.filter(QueryFilter::op(field, operator, value))
    }

    pub fn or_where_op(self, field: &str, operator: QueryOperator, value: impl Into<Value>) -> Self {
        self.filter(QueryFilter::op(field, operator, value).or())
    }

    where_pair! {
        where_eq, or_where_eq => eq;
        where_ne, or_where_ne => ne;
        where_gt, or_where_gt => gt;
        where_gte, or_where_gte => gte;
        where_lt, or_where_lt => lt;
        where_lte, or_where_lte => lte;
        where_like, or_where_like => like;
        where_not_like, or_where_not_like => not_like;
        where_find_in_set, or_where_find_in_set => find_in_set;
    }

    pub fn where_in<V: Into<Value>>(self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.filter(QueryFilter::in_values(field, values))
    }

    pub fn or_where_in<V: Into<Value>>(self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.filter(QueryFilter::in_values(field, values).or())
    }

    pub fn where_not_in<V: Into<Value>>(self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.filter(QueryFilter::not_in(field, values))
    }

    pub fn or_where_not_in<V: Into<Value>>(
        self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.filter(QueryFilter::not_in(field, values).or())
    }

    pub fn where_between(self, field: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.filter(QueryFilter::between(field, low, high))
    }

    pub fn or_where_between(
        self,
        field: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        self.filter(QueryFilter::between(field, low, high).or())
    }

    pub fn where_null(self, field: &str) -> Self {
        self.filter(QueryFilter::is_null(field))
    }

    pub fn where_not_null(self, field: &str) -> Self {
        self.filter(QueryFilter::is_not_null(field))
    }

    pub fn where_raw(self, sql: impl Into<String>) -> Self {
        self.filter(QueryFilter::raw(sql))
    }

    pub fn or_where_raw(self, sql: impl Into<String>) -> Self {
        self.filter(QueryFilter::raw(sql).or())
    }

    /// Parenthesized group joined with `and`
    pub fn where_group(self, filters: Vec<QueryFilter>) -> Self {
        self.filter(QueryFilter::group(filters))
    }

    /// Parenthesized group joined with `or`
    pub fn or_where_group(self, filters: Vec<QueryFilter>) -> Self {
        self.filter(QueryFilter::group(filters).or())
    }

    pub fn order_by(mut self, field: &str, order: SortOrder) -> Self {
        self.order_by.push((field.to_string(), order));
        self
    }

    pub fn order_by_asc(self, field: &str) -> Self {
        self.order_by(field, SortOrder::Asc)
    }

    pub fn order_by_desc(self, field: &str) -> Self {
        self.order_by(field, SortOrder::Desc)
    }

    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.group_by = Some(field.into());
        self
    }

    /// Zero means no limit
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// 1-based page of `size` rows
    pub fn pagination(mut self, page: u64, size: u64) -> Self {
        self.limit = size;
        self.offset = page_offset(page, size);
        self
    }

    pub fn for_update(mut self) -> Self {
        self.for_update = true;
        self
    }

    pub fn conditions(&self) -> &[QueryFilter] {
        &self.conditions
    }

    pub fn has_conditions(&self) -> bool {
        !self.conditions.is_empty()
    }

    pub fn updates(&self) -> &[(String, UpdateOperation)] {
        &self.updates
    }

    pub fn get_limit(&self) -> u64 {
        self.limit
    }

    pub fn get_offset(&self) -> u64 {
        self.offset
    }

    /// True if a top-level condition compares `field`. Groups are not searched.
    pub fn has_field_in_where(&self, field: &str) -> bool {
        self.conditions.iter().any(|node| match node {
            QueryFilter::Condition { condition, .. } => condition.field == field,
            _ => false,
        })
    }

    /// True if every field appears in a top-level condition
    pub fn fields_in_where(&self, fields: &[&str]) -> bool {
        fields.iter().all(|f| self.has_field_in_where(f))
    }

    /// Same options without limit and offset
    pub fn without_pagination(mut self) -> Self {
        self.limit = 0;
        self.offset = 0;
        self
    }

    /// `database.table`, or the bare table
    pub fn qualified_table(&self) -> String {
        match &self.database {
            Some(database) => format!("{}.{}", database, self.table),
            None => self.table.clone(),
        }
    }

    /// Build WHERE expression (without the keyword) and its arguments
    pub fn build_where_clause(&self) -> (String, Vec<Value>) {
        SqlGenerator::build_where_clause(&self.conditions)
    }

    pub fn build_select(&self) -> (String, Vec<Value>) {
        SqlGenerator::select(self)
    }

    pub fn build_update(&self) -> (String, Vec<Value>) {
        SqlGenerator::update(self)
    }

    pub fn build_delete(&self) -> (String, Vec<Value>) {
        SqlGenerator::delete(self)
    }
}
