//! Identifier validation
//!
//! Table and column names are spliced into SQL text unquoted, so every name
//! that reaches a builder from a record or model configuration is checked
//! here first.

use std::fmt;

/// Validation errors for database identifiers
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Name contains invalid characters (only alphanumeric and underscore allowed)
    InvalidCharacters(String),
    TooLong {
        name: String,
        length: usize,
        max_length: usize,
    },
    Empty,
    /// Name must start with a letter or underscore
    InvalidStartCharacter(String),
    ReservedKeyword(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidCharacters(name) => {
                write!(f, "Invalid characters in name '{}': only alphanumeric characters and underscores are allowed", name)
            }
            ValidationError::TooLong {
                name,
                length,
                max_length,
            } => {
                write!(
                    f,
                    "Name '{}' is too long: {} characters (max {})",
                    name, length, max_length
                )
            }
            ValidationError::Empty => write!(f, "Name cannot be empty"),
            ValidationError::InvalidStartCharacter(name) => {
                write!(f, "Name '{}' must start with a letter or underscore", name)
            }
            ValidationError::ReservedKeyword(name) => {
                write!(f, "Name '{}' is a reserved SQL keyword", name)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Shortest identifier limit among the supported databases (PostgreSQL)
const MAX_LENGTH: usize = 63;

/// Words reserved by all three supported databases
const RESERVED_KEYWORDS: &[&str] = &[
    "ALL", "ALTER", "AND", "AS", "BETWEEN", "BY", "CASE", "CHECK", "CONSTRAINT", "CREATE",
    "DEFAULT", "DELETE", "DISTINCT", "DROP", "ELSE", "EXISTS", "FOREIGN", "FROM", "GROUP",
    "HAVING", "IN", "INDEX", "INSERT", "INTO", "IS", "JOIN", "LIKE", "LIMIT", "NOT", "NULL",
    "ON", "OR", "ORDER", "PRIMARY", "REFERENCES", "SELECT", "SET", "TABLE", "THEN", "UNION",
    "UNIQUE", "UPDATE", "VALUES", "WHEN", "WHERE",
];

/// Check a table or column name
pub fn validate_identifier(name: &str) -> Result<(), ValidationError> {
    let first_char = name.chars().next().ok_or(ValidationError::Empty)?;

    if name.len() > MAX_LENGTH {
        return Err(ValidationError::TooLong {
            name: name.to_string(),
            length: name.len(),
            max_length: MAX_LENGTH,
        });
    }

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(ValidationError::InvalidStartCharacter(name.to_string()));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::InvalidCharacters(name.to_string()));
    }

    if RESERVED_KEYWORDS.contains(&name.to_ascii_uppercase().as_str()) {
        return Err(ValidationError::ReservedKeyword(name.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        let long = "a".repeat(63);
        for name in ["users", "_private", "order_items", "is_deleted", "T1", long.as_str()] {
            assert!(validate_identifier(name).is_ok(), "should accept {}", name);
        }
    }

    #[test]
    fn test_invalid_identifiers() {
        let test_cases = [
            ("", ValidationError::Empty),
            (
                "123table",
                ValidationError::InvalidStartCharacter("123table".to_string()),
            ),
            (
                "user-name",
                ValidationError::InvalidCharacters("user-name".to_string()),
            ),
            (
                "name; DROP TABLE users",
                ValidationError::InvalidCharacters("name; DROP TABLE users".to_string()),
            ),
            ("select", ValidationError::ReservedKeyword("select".to_string())),
            ("Order", ValidationError::ReservedKeyword("Order".to_string())),
        ];

        for (name, expected) in test_cases {
            assert_eq!(validate_identifier(name), Err(expected), "name {:?}", name);
        }
    }

    #[test]
    fn test_too_long() {
        let name = "a".repeat(64);
        assert!(matches!(
            validate_identifier(&name),
            Err(ValidationError::TooLong { length: 64, .. })
        ));
    }
}
