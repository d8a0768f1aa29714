//! Condition tree
//!
//! A WHERE clause is an ordered list of [`QueryFilter`] nodes. Each node
//! carries the connective that joins it to whatever precedes it. The first
//! node's connective is ignored and nodes are never reordered, so grouping
//! only happens through explicit [`QueryFilter::Group`] nodes.

use std::fmt;
use std::str::FromStr;
use type_mapping::Value;

/// Query condition operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
    In,
    NotIn,
    Between,
    /// MySQL `find_in_set(?, field)`
    FindInSet,
    IsNull,
    IsNotNull,
}

impl QueryOperator {
    pub fn to_sql(&self) -> &'static str {
        match self {
            QueryOperator::Eq => "=",
            QueryOperator::Ne => "!=",
            QueryOperator::Gt => ">",
            QueryOperator::Gte => ">=",
            QueryOperator::Lt => "<",
            QueryOperator::Lte => "<=",
            QueryOperator::Like => "like",
            QueryOperator::NotLike => "not like",
            QueryOperator::In => "in",
            QueryOperator::NotIn => "not in",
            QueryOperator::Between => "between",
            QueryOperator::FindInSet => "find_in_set",
            QueryOperator::IsNull => "is null",
            QueryOperator::IsNotNull => "is not null",
        }
    }
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_sql())
    }
}

impl FromStr for QueryOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_lowercase();
        Ok(match normalized.as_str() {
            "=" | "eq" => QueryOperator::Eq,
            "!=" | "<>" | "ne" => QueryOperator::Ne,
            ">" | "gt" => QueryOperator::Gt,
            ">=" | "gte" => QueryOperator::Gte,
            "<" | "lt" => QueryOperator::Lt,
            "<=" | "lte" => QueryOperator::Lte,
            "like" => QueryOperator::Like,
            "not like" => QueryOperator::NotLike,
            "in" => QueryOperator::In,
            "not in" => QueryOperator::NotIn,
            "between" => QueryOperator::Between,
            "find_in_set" => QueryOperator::FindInSet,
            "is null" => QueryOperator::IsNull,
            "is not null" => QueryOperator::IsNotNull,
            _ => return Err(format!("unsupported operator '{}'", s)),
        })
    }
}

/// Connective joining a node to the expression before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl LogicalOperator {
    pub fn to_sql(&self) -> &'static str {
        match self {
            LogicalOperator::And => "and",
            LogicalOperator::Or => "or",
        }
    }
}

/// Single binary condition. `values` holds one value for comparison
/// operators, all members for `in`, two bounds for `between` and nothing for
/// the null checks.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCondition {
    pub field: String,
    pub operator: QueryOperator,
    pub values: Vec<Value>,
}

/// Query filter that can be nested
#[derive(Debug, Clone, PartialEq)]
pub enum QueryFilter {
    Condition {
        condition: QueryCondition,
        logic: LogicalOperator,
    },
    /// Emitted verbatim with no arguments
    Raw { sql: String, logic: LogicalOperator },
    Group {
        filters: Vec<QueryFilter>,
        logic: LogicalOperator,
    },
}

impl QueryFilter {
    /// Create a simple condition
    pub fn condition(field: &str, operator: QueryOperator, values: Vec<Value>) -> Self {
        Self::Condition {
            condition: QueryCondition {
                field: field.to_string(),
                operator,
                values,
            },
            logic: LogicalOperator::And,
        }
    }

    /// Condition from an operator and a single operand. Lists passed as
    /// `Value::Json` arrays are expanded for `in`, `not in` and `between`.
    pub fn op(field: &str, operator: QueryOperator, value: impl Into<Value>) -> Self {
        let value = value.into();
        let values = match (operator, value) {
            (QueryOperator::IsNull | QueryOperator::IsNotNull, _) => Vec::new(),
            (
                QueryOperator::In | QueryOperator::NotIn | QueryOperator::Between,
                Value::Json(serde_json::Value::Array(items)),
            ) => items.into_iter().map(Value::from).collect(),
            (_, value) => vec![value],
        };
        Self::condition(field, operator, values)
    }

    /// Parenthesized sub-group
    pub fn group(filters: Vec<QueryFilter>) -> Self {
        Self::Group {
            filters,
            logic: LogicalOperator::And,
        }
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw {
            sql: sql.into(),
            logic: LogicalOperator::And,
        }
    }

    /// Join this node with `or`
    pub fn or(self) -> Self {
        self.with_logic(LogicalOperator::Or)
    }

    /// Join this node with `and`
    pub fn and(self) -> Self {
        self.with_logic(LogicalOperator::And)
    }

    pub fn with_logic(self, logic: LogicalOperator) -> Self {
        match self {
            Self::Condition { condition, .. } => Self::Condition { condition, logic },
            Self::Raw { sql, .. } => Self::Raw { sql, logic },
            Self::Group { filters, .. } => Self::Group { filters, logic },
        }
    }

    pub fn logic(&self) -> LogicalOperator {
        match self {
            Self::Condition { logic, .. } | Self::Raw { logic, .. } | Self::Group { logic, .. } => {
                *logic
            }
        }
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Eq, vec![value.into()])
    }

    pub fn ne(field: &str, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Ne, vec![value.into()])
    }

    pub fn gt(field: &str, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Gt, vec![value.into()])
    }

    pub fn gte(field: &str, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Gte, vec![value.into()])
    }

    pub fn lt(field: &str, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Lt, vec![value.into()])
    }

    pub fn lte(field: &str, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Lte, vec![value.into()])
    }

    pub fn like(field: &str, pattern: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Like, vec![pattern.into()])
    }

    pub fn not_like(field: &str, pattern: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::NotLike, vec![pattern.into()])
    }

    pub fn in_values<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Self::condition(
            field,
            QueryOperator::In,
            values.into_iter().map(Into::into).collect(),
        )
    }

    pub fn not_in<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Self::condition(
            field,
            QueryOperator::NotIn,
            values.into_iter().map(Into::into).collect(),
        )
    }

    pub fn between(field: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Between, vec![low.into(), high.into()])
    }

    pub fn find_in_set(field: &str, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::FindInSet, vec![value.into()])
    }

    pub fn is_null(field: &str) -> Self {
        Self::condition(field, QueryOperator::IsNull, Vec::new())
    }

    pub fn is_not_null(field: &str) -> Self {
        Self::condition(field, QueryOperator::IsNotNull, Vec::new())
    }
}
