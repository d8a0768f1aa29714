//! SQL generation
//!
//! Pure functions from a [`QueryBuilder`] to a statement with `?`
//! placeholders and its positional arguments. Dialect-specific placeholder
//! rewriting happens later, right before execution.

use crate::query_builder::builder::QueryBuilder;
use crate::query_builder::filter::{QueryCondition, QueryFilter, QueryOperator};
use type_mapping::Value;

pub struct SqlGenerator;

impl SqlGenerator {
    /// Build the WHERE expression (no keyword) from conditions
    pub fn build_where_clause(conditions: &[QueryFilter]) -> (String, Vec<Value>) {
        let mut values = Vec::new();
        let sql = Self::build_filter_list(conditions, &mut values);
        (sql, values)
    }

    fn build_filter_list(filters: &[QueryFilter], values: &mut Vec<Value>) -> String {
        let mut tokens: Vec<String> = Vec::new();

        for filter in filters {
            let sql = match filter {
                QueryFilter::Condition { condition, .. } => {
                    Self::build_single_condition_sql(condition, values)
                }
                QueryFilter::Raw { sql, .. } => sql.trim().to_string(),
                QueryFilter::Group { filters, .. } => {
                    let inner = Self::build_filter_list(filters, values);
                    if inner.is_empty() {
                        String::new()
                    } else {
                        format!("({})", inner)
                    }
                }
            };

            if sql.is_empty() {
                continue;
            }
            if !tokens.is_empty() {
                tokens.push(filter.logic().to_sql().to_string());
            }
            tokens.push(sql);
        }

        tokens.join(" ")
    }

    fn build_single_condition_sql(condition: &QueryCondition, values: &mut Vec<Value>) -> String {
        let field = &condition.field;

        match condition.operator {
            QueryOperator::In | QueryOperator::NotIn => {
                if condition.values.is_empty() {
                    // Nothing is in an empty set
                    return if condition.operator == QueryOperator::In {
                        "1=0".to_string()
                    } else {
                        "1=1".to_string()
                    };
                }
                values.extend(condition.values.iter().cloned());
                format!(
                    "{} {} ({})",
                    field,
                    condition.operator.to_sql(),
                    Self::placeholders(condition.values.len())
                )
            }
            QueryOperator::Between => {
                let mut bounds = condition.values.iter().cloned();
                values.push(bounds.next().unwrap_or_default());
                values.push(bounds.next().unwrap_or_default());
                format!("{} between ? and ?", field)
            }
            QueryOperator::FindInSet => {
                values.push(condition.values.first().cloned().unwrap_or_default());
                format!("find_in_set(?, {})", field)
            }
            QueryOperator::IsNull | QueryOperator::IsNotNull => {
                format!("{} {}", field, condition.operator.to_sql())
            }
            operator => {
                values.push(condition.values.first().cloned().unwrap_or_default());
                format!("{} {} ?", field, operator.to_sql())
            }
        }
    }

    /// `count` placeholders joined by `", "`
    pub fn placeholders(count: usize) -> String {
        vec!["?"; count].join(", ")
    }

    /// select <fields> from <table> [where] [group by] [order by] [limit ? offset ?] [for update]
    pub fn select(query: &QueryBuilder) -> (String, Vec<Value>) {
        let fields = if query.fields.is_empty() {
            "*".to_string()
        } else {
            query.fields.join(", ")
        };
        let mut sql = format!("select {} from {}", fields, query.qualified_table());

        let (where_clause, mut values) = query.build_where_clause();
        if !where_clause.is_empty() {
            sql.push_str(" where ");
            sql.push_str(&where_clause);
        }

        if let Some(group_by) = &query.group_by {
            sql.push_str(" group by ");
            sql.push_str(group_by);
        }

        if !query.order_by.is_empty() {
            let order_items: Vec<String> = query
                .order_by
                .iter()
                .map(|(field, order)| format!("{} {}", field, order.to_sql()))
                .collect();
            sql.push_str(" order by ");
            sql.push_str(&order_items.join(", "));
        }

        if query.limit != 0 {
            sql.push_str(" limit ? offset ?");
            values.push(Value::UInt(query.limit));
            values.push(Value::UInt(query.offset));
        }

        if query.for_update {
            sql.push_str(" for update");
        }

        (sql, values)
    }

    /// Single-row insert from the builder's assigned values, in assignment order
    pub fn insert(query: &QueryBuilder) -> (String, Vec<Value>) {
        let fields: Vec<String> = query.updates.iter().map(|(f, _)| f.clone()).collect();
        let row: Vec<Value> = query
            .updates
            .iter()
            .map(|(_, op)| op.value().clone())
            .collect();
        Self::insert_rows(query, &fields, vec![row])
    }

    /// Multi-row insert. Every row must hold one value per field.
    pub fn insert_rows(
        query: &QueryBuilder,
        fields: &[String],
        rows: Vec<Vec<Value>>,
    ) -> (String, Vec<Value>) {
        let row_placeholders = format!("({})", Self::placeholders(fields.len()));
        let groups = vec![row_placeholders; rows.len()].join(", ");
        let sql = format!(
            "insert into {} ({}) values {}",
            query.qualified_table(),
            fields.join(", "),
            groups
        );
        (sql, rows.into_iter().flatten().collect())
    }

    /// update <table> set <assignments> [where]. Assignment arguments come first.
    pub fn update(query: &QueryBuilder) -> (String, Vec<Value>) {
        let assignments: Vec<String> = query
            .updates
            .iter()
            .map(|(field, op)| op.to_sql(field))
            .collect();
        let mut values: Vec<Value> = query
            .updates
            .iter()
            .map(|(_, op)| op.value().clone())
            .collect();

        let mut sql = format!(
            "update {} set {}",
            query.qualified_table(),
            assignments.join(", ")
        );

        let (where_clause, where_values) = query.build_where_clause();
        if !where_clause.is_empty() {
            sql.push_str(" where ");
            sql.push_str(&where_clause);
            values.extend(where_values);
        }

        (sql, values)
    }

    /// delete from <table> [where]
    pub fn delete(query: &QueryBuilder) -> (String, Vec<Value>) {
        let mut sql = format!("delete from {}", query.qualified_table());
        let (where_clause, values) = query.build_where_clause();
        if !where_clause.is_empty() {
            sql.push_str(" where ");
            sql.push_str(&where_clause);
        }
        (sql, values)
    }
}
