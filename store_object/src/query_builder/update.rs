use type_mapping::Value;

/// How an `update` assigns a column
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOperation {
    /// field = ?
    Set(Value),

    /// field = field + ?
    Increment(Value),

    /// field = field - ?
    Decrement(Value),
}

impl UpdateOperation {
    /// Assignment SQL for this operation with a `?` placeholder
    pub fn to_sql(&self, field_name: &str) -> String {
        match self {
            UpdateOperation::Set(_) => format!("{} = ?", field_name),
            UpdateOperation::Increment(_) => format!("{} = {} + ?", field_name, field_name),
            UpdateOperation::Decrement(_) => format!("{} = {} - ?", field_name, field_name),
        }
    }

    /// The value bound for the placeholder
    pub fn value(&self) -> &Value {
        match self {
            UpdateOperation::Set(v) | UpdateOperation::Increment(v) | UpdateOperation::Decrement(v) => {
                v
            }
        }
    }
}
