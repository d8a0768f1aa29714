//! PostgreSQL binding and decoding
//!
//! PostgreSQL has no unsigned integers and no last-insert-id. Unsigned
//! arguments are narrowed to `BIGINT`, or sent as `NUMERIC` when they do not
//! fit; generated keys come back through `RETURNING`. A `NUMERIC` that does
//! not fit a [`Decimal`] is returned as its decimal text.

use crate::errors::DbError;
use crate::executor::ExecResult;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, PgConnection, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Executor, Postgres, Row, Statement, TypeInfo, ValueRef};
use type_mapping::{text_or_bytes, ColumnKind, FloatWidth, IntWidth, Record, TemporalKind, Value};
use uuid::Uuid;

pub async fn query(conn: &mut PgConnection, sql: &str, args: &[Value]) -> Result<Vec<Record>, DbError> {
    let statement = (&mut *conn).prepare(sql).await.map_err(DbError::step("prepare"))?;
    let rows = bind_values(statement.query(), args)
        .fetch_all(&mut *conn)
        .await
        .map_err(DbError::step("query"))?;
    decode_rows(&rows).map_err(DbError::step("decode"))
}

pub async fn execute(conn: &mut PgConnection, sql: &str, args: &[Value]) -> Result<ExecResult, DbError> {
    let statement = (&mut *conn).prepare(sql).await.map_err(DbError::step("prepare"))?;
    let result = bind_values(statement.query(), args)
        .execute(&mut *conn)
        .await
        .map_err(DbError::step("execute"))?;
    Ok(ExecResult {
        rows_affected: result.rows_affected(),
        last_insert_id: None,
    })
}

fn bind_values<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    args: &[Value],
) -> Query<'q, Postgres, PgArguments> {
    for value in args {
        query = match value {
            // Untyped NULL is not expressible; the server coerces a text NULL
            Value::Null => query.bind(None::<String>),
            Value::Bool(v) => query.bind(*v),
            Value::Int(v) => query.bind(*v),
            Value::UInt(v) => match i64::try_from(*v) {
                Ok(v) => query.bind(v),
                Err(_) => query.bind(Decimal::from(*v)),
            },
            Value::Float(v) => query.bind(*v),
            Value::String(v) => query.bind(v.clone()),
            Value::Bytes(v) => query.bind(v.clone()),
            Value::Timestamp(v) => query.bind(*v),
            Value::Decimal(v) => query.bind(*v),
            Value::Json(v) => query.bind(sqlx::types::Json(v.clone())),
        };
    }
    query
}

/// `TIMESTAMP` is zone-less in PostgreSQL, unlike MySQL
fn classify(type_name: &str) -> ColumnKind {
    match type_name {
        "TIMESTAMP" => ColumnKind::Temporal(TemporalKind::DateTime),
        other => ColumnKind::classify(other),
    }
}

fn decode_rows(rows: &[PgRow]) -> Result<Vec<Record>, sqlx::Error> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let columns: Vec<(String, ColumnKind)> = first
        .columns()
        .iter()
        .map(|col| (col.name().to_string(), classify(col.type_info().name())))
        .collect();

    rows.iter()
        .map(|row| {
            columns
                .iter()
                .enumerate()
                .map(|(index, (name, kind))| Ok((name.clone(), decode_cell(row, index, *kind)?)))
                .collect::<Result<Record, sqlx::Error>>()
        })
        .collect()
}

fn decode_cell(row: &PgRow, index: usize, kind: ColumnKind) -> Result<Value, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match kind {
        ColumnKind::Bool => Value::Bool(row.try_get(index)?),
        ColumnKind::Int(IntWidth::W8 | IntWidth::W16) => row.try_get::<i16, _>(index)?.into(),
        ColumnKind::Int(IntWidth::W32) => row.try_get::<i32, _>(index)?.into(),
        ColumnKind::Int(IntWidth::W64) | ColumnKind::UInt(_) => row.try_get::<i64, _>(index)?.into(),
        ColumnKind::Float(FloatWidth::F32) => row.try_get::<f32, _>(index)?.into(),
        ColumnKind::Float(FloatWidth::F64) => row.try_get::<f64, _>(index)?.into(),
        // NaN, infinities and over-wide values do not fit a Decimal
        ColumnKind::Decimal => match row.try_get::<Decimal, _>(index) {
            Ok(decimal) => decimal.into(),
            Err(_) => numeric_fallback(row, index)?,
        },
        ColumnKind::Temporal(TemporalKind::Date) => row.try_get::<NaiveDate, _>(index)?.into(),
        ColumnKind::Temporal(TemporalKind::Time) => row.try_get::<NaiveTime, _>(index)?.into(),
        ColumnKind::Temporal(TemporalKind::DateTime) => {
            row.try_get::<NaiveDateTime, _>(index)?.into()
        }
        ColumnKind::Temporal(TemporalKind::DateTimeTz) => {
            row.try_get::<DateTime<Utc>, _>(index)?.into()
        }
        ColumnKind::Binary => Value::Bytes(row.try_get(index)?),
        ColumnKind::Json => Value::Json(row.try_get(index)?),
        ColumnKind::Uuid => row.try_get::<Uuid, _>(index)?.into(),
        ColumnKind::Text => Value::String(row.try_get(index)?),
        ColumnKind::Unknown => match row.try_get::<String, _>(index) {
            Ok(text) => Value::String(text),
            Err(_) => text_or_bytes(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        },
    };
    Ok(value)
}

fn numeric_fallback(row: &PgRow, index: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    let bytes = raw.as_bytes().map_err(sqlx::Error::Decode)?;
    numeric_text(bytes)
        .map(Value::String)
        .ok_or_else(|| sqlx::Error::Decode("malformed NUMERIC value".into()))
}

/// Render a binary `NUMERIC`: a header of digit count, weight, sign and
/// display scale, then base-10000 digit groups, all big-endian 16-bit
fn numeric_text(bytes: &[u8]) -> Option<String> {
    let word = |at: usize| -> Option<u16> {
        Some(u16::from_be_bytes([*bytes.get(at)?, *bytes.get(at + 1)?]))
    };
    let count = usize::from(word(0)?);
    let weight = i32::from(word(2)? as i16);
    let sign = word(4)?;
    let scale = usize::from(word(6)?);

    let negative = match sign {
        0x0000 => false,
        0x4000 => true,
        0xC000 => return Some("NaN".to_string()),
        0xD000 => return Some("Infinity".to_string()),
        0xF000 => return Some("-Infinity".to_string()),
        _ => return None,
    };
    let groups: Vec<u16> = (0..count).map(|i| word(8 + 2 * i)).collect::<Option<_>>()?;
    let group = |position: i32| -> u16 {
        usize::try_from(position)
            .ok()
            .and_then(|i| groups.get(i).copied())
            .unwrap_or(0)
    };

    let mut text = String::new();
    if negative {
        text.push('-');
    }
    if weight < 0 {
        text.push('0');
    } else {
        text.push_str(&group(0).to_string());
        for position in 1..=weight {
            text.push_str(&format!("{:04}", group(position)));
        }
    }

    if scale > 0 {
        let mut fraction = String::new();
        let mut position = weight + 1;
        while fraction.len() < scale {
            fraction.push_str(&format!("{:04}", group(position)));
            position += 1;
        }
        fraction.truncate(scale);
        text.push('.');
        text.push_str(&fraction);
    }
    Some(text)
}
