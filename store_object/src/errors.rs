use cache_system::CacheError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Bad model or connection setup. Returned by every call on an unbound model.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Record not found")]
    NotFound,

    /// Raised before any SQL is sent
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error during {step}: {source}")]
    Execution {
        step: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Hook error on field '{field}': {message}")]
    Hook { field: String, message: String },

    /// A value that cannot be bound for the target driver
    #[error("Parameter error: {0}")]
    Parameter(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out")]
    Timeout,
}

impl DbError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound)
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, DbError::Validation(_))
    }

    /// Closure for `map_err` tagging a driver error with the failing step
    pub(crate) fn step(step: &'static str) -> impl FnOnce(sqlx::Error) -> DbError {
        move |source| DbError::Execution { step, source }
    }

    pub(crate) fn hook(field: &str, message: impl Into<String>) -> DbError {
        DbError::Hook {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<crate::validation::ValidationError> for DbError {
    fn from(err: crate::validation::ValidationError) -> Self {
        DbError::Validation(err.to_string())
    }
}
