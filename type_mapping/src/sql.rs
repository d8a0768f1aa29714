//! SQL column type classification
//!
//! Drivers report a type name per result column. The name is classified once
//! per result set and the resulting [`ColumnKind`] drives extraction of every
//! row in that set.

use crate::types::Value;
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatWidth {
    F32,
    F64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    Date,
    Time,
    DateTime,
    /// Carries a zone offset (TIMESTAMPTZ, MySQL TIMESTAMP)
    DateTimeTz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Bool,
    Int(IntWidth),
    UInt(IntWidth),
    Float(FloatWidth),
    Decimal,
    Temporal(TemporalKind),
    Text,
    Binary,
    Json,
    Uuid,
    Unknown,
}

impl ColumnKind {
    /// Classify a driver-reported type name such as `INT UNSIGNED`,
    /// `VARCHAR`, `INT8` or `DECIMAL(10,2)`.
    pub fn classify(type_name: &str) -> Self {
        let upper = type_name.trim().to_ascii_uppercase();
        let unsigned = upper.contains("UNSIGNED");
        let base = upper
            .replace("UNSIGNED", "")
            .split('(')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();

        let int = |width| {
            if unsigned {
                ColumnKind::UInt(width)
            } else {
                ColumnKind::Int(width)
            }
        };

        match base.as_str() {
            "BOOL" | "BOOLEAN" => ColumnKind::Bool,
            "TINYINT" | "INT1" => int(IntWidth::W8),
            "SMALLINT" | "INT2" | "YEAR" => int(IntWidth::W16),
            "INT" | "MEDIUMINT" | "INT4" => int(IntWidth::W32),
            "BIGINT" | "INT8" | "INTEGER" => int(IntWidth::W64),
            "FLOAT" | "FLOAT4" | "REAL" => ColumnKind::Float(FloatWidth::F32),
            "DOUBLE" | "FLOAT8" | "DOUBLE PRECISION" => ColumnKind::Float(FloatWidth::F64),
            "DECIMAL" | "NUMERIC" | "NEWDECIMAL" => ColumnKind::Decimal,
            "DATE" => ColumnKind::Temporal(TemporalKind::Date),
            "TIME" => ColumnKind::Temporal(TemporalKind::Time),
            "DATETIME" => ColumnKind::Temporal(TemporalKind::DateTime),
            "TIMESTAMP" => ColumnKind::Temporal(TemporalKind::DateTimeTz),
            "TIMESTAMPTZ" => ColumnKind::Temporal(TemporalKind::DateTimeTz),
            "BINARY" | "VARBINARY" | "BYTEA" => ColumnKind::Binary,
            "JSON" | "JSONB" => ColumnKind::Json,
            "UUID" => ColumnKind::Uuid,
            "CHAR" | "VARCHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "BPCHAR"
            | "NAME" | "CITEXT" | "ENUM" | "SET" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB"
            | "LONGBLOB" | "CLOB" => ColumnKind::Text,
            _ => ColumnKind::Unknown,
        }
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, ColumnKind::Text | ColumnKind::Unknown)
    }
}

/// Decimal columns are read as text. Unparsable text is kept as a string.
pub fn decimal_from_text(text: Option<String>) -> Value {
    match text {
        None => Value::Null,
        Some(text) => match Decimal::from_str(text.trim()) {
            Ok(decimal) => Value::Decimal(decimal),
            // Exponent forms such as 1E+3
            Err(_) => match Decimal::from_scientific(text.trim()) {
                Ok(decimal) => Value::Decimal(decimal),
                Err(_) => Value::String(text),
            },
        },
    }
}

/// Text columns become strings. Bytes that are not UTF-8 stay bytes.
pub fn text_or_bytes(bytes: Vec<u8>) -> Value {
    match String::from_utf8(bytes) {
        Ok(text) => Value::String(text),
        Err(err) => Value::Bytes(err.into_bytes()),
    }
}

/// Render a value as an SQL literal. Used for statement logging only.
pub fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Int(v) => v.to_string(),
        Value::UInt(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Decimal(d) => d.to_string(),
        Value::String(s) => quote(s),
        Value::Bytes(b) => match std::str::from_utf8(b) {
            Ok(text) => quote(text),
            Err(_) => {
                let hex: String = b.iter().map(|byte| format!("{:02X}", byte)).collect();
                format!("X'{}'", hex)
            }
        },
        Value::Timestamp(t) => quote(&t.format("%Y-%m-%d %H:%M:%S").to_string()),
        Value::Json(v) => quote(&v.to_string()),
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Inline positional `?` arguments into a statement for log output
pub fn render_sql(sql: &str, args: &[Value]) -> String {
    let mut rendered = String::with_capacity(sql.len() + args.len() * 8);
    let mut args = args.iter();
    for ch in sql.chars() {
        match ch {
            '?' => match args.next() {
                Some(arg) => rendered.push_str(&sql_literal(arg)),
                None => rendered.push('?'),
            },
            other => rendered.push(other),
        }
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_integer_widths() {
        assert_eq!(ColumnKind::classify("TINYINT"), ColumnKind::Int(IntWidth::W8));
        assert_eq!(ColumnKind::classify("smallint"), ColumnKind::Int(IntWidth::W16));
        assert_eq!(ColumnKind::classify("INT4"), ColumnKind::Int(IntWidth::W32));
        assert_eq!(ColumnKind::classify("MEDIUMINT"), ColumnKind::Int(IntWidth::W32));
        assert_eq!(ColumnKind::classify("INT8"), ColumnKind::Int(IntWidth::W64));
        assert_eq!(ColumnKind::classify("INTEGER"), ColumnKind::Int(IntWidth::W64));
    }

    #[test]
    fn test_classify_unsigned_in_either_position() {
        assert_eq!(
            ColumnKind::classify("INT UNSIGNED"),
            ColumnKind::UInt(IntWidth::W32)
        );
        assert_eq!(
            ColumnKind::classify("UNSIGNED BIGINT"),
            ColumnKind::UInt(IntWidth::W64)
        );
        assert_eq!(
            ColumnKind::classify("TINYINT UNSIGNED"),
            ColumnKind::UInt(IntWidth::W8)
        );
    }

    #[test]
    fn test_classify_other_families() {
        assert_eq!(ColumnKind::classify("DECIMAL(10,2)"), ColumnKind::Decimal);
        assert_eq!(ColumnKind::classify("NUMERIC"), ColumnKind::Decimal);
        assert_eq!(ColumnKind::classify("VARCHAR"), ColumnKind::Text);
        assert_eq!(ColumnKind::classify("MEDIUMBLOB"), ColumnKind::Text);
        assert_eq!(ColumnKind::classify("BYTEA"), ColumnKind::Binary);
        assert_eq!(ColumnKind::classify("FLOAT8"), ColumnKind::Float(FloatWidth::F64));
        assert_eq!(ColumnKind::classify("REAL"), ColumnKind::Float(FloatWidth::F32));
        assert_eq!(
            ColumnKind::classify("TIMESTAMPTZ"),
            ColumnKind::Temporal(TemporalKind::DateTimeTz)
        );
        assert_eq!(
            ColumnKind::classify("DATETIME"),
            ColumnKind::Temporal(TemporalKind::DateTime)
        );
        assert_eq!(ColumnKind::classify("JSONB"), ColumnKind::Json);
        assert_eq!(ColumnKind::classify("GEOMETRY"), ColumnKind::Unknown);
    }

    #[test]
    fn test_decimal_null_is_absent() {
        assert_eq!(decimal_from_text(None), Value::Null);
    }

    #[test]
    fn test_decimal_parses_text() {
        assert_eq!(
            decimal_from_text(Some("12.50".to_string())),
            Value::Decimal(Decimal::new(1250, 2))
        );
        assert_eq!(
            decimal_from_text(Some("1E+3".to_string())),
            Value::Decimal(Decimal::from(1000))
        );
    }

    #[test]
    fn test_decimal_falls_back_to_raw_string() {
        assert_eq!(
            decimal_from_text(Some("not-a-number".to_string())),
            Value::String("not-a-number".to_string())
        );
    }

    #[test]
    fn test_text_or_bytes() {
        assert_eq!(text_or_bytes(b"abc".to_vec()), Value::String("abc".into()));
        assert_eq!(
            text_or_bytes(vec![0xff, 0xfe]),
            Value::Bytes(vec![0xff, 0xfe])
        );
    }

    #[test]
    fn test_render_sql_inlines_arguments() {
        let sql = "select * from users where name = ? and age > ? and flag = ? and note = ? and x = ?";
        let rendered = render_sql(
            sql,
            &[
                Value::from("O'Brien"),
                Value::Int(18),
                Value::Bool(true),
                Value::Null,
            ],
        );
        assert_eq!(
            rendered,
            "select * from users where name = 'O''Brien' and age > 18 and flag = TRUE and note = NULL and x = ?"
        );
    }
}
