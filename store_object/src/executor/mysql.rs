//! MySQL binding and decoding

use crate::errors::DbError;
use crate::executor::ExecResult;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::mysql::{MySqlArguments, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Executor, MySql, Row, Statement, TypeInfo, ValueRef};
use type_mapping::{
    decimal_from_text, text_or_bytes, ColumnKind, FloatWidth, IntWidth, Record, TemporalKind, Value,
};

pub async fn query(
    conn: &mut MySqlConnection,
    sql: &str,
    args: &[Value],
) -> Result<Vec<Record>, DbError> {
    let statement = (&mut *conn).prepare(sql).await.map_err(DbError::step("prepare"))?;
    let rows = bind_values(statement.query(), args)
        .fetch_all(&mut *conn)
        .await
        .map_err(DbError::step("query"))?;
    decode_rows(&rows).map_err(DbError::step("decode"))
}

pub async fn execute(
    conn: &mut MySqlConnection,
    sql: &str,
    args: &[Value],
) -> Result<ExecResult, DbError> {
    let statement = (&mut *conn).prepare(sql).await.map_err(DbError::step("prepare"))?;
    let result = bind_values(statement.query(), args)
        .execute(&mut *conn)
        .await
        .map_err(DbError::step("execute"))?;

    // MySQL reports 0 when the statement generated no key
    let last_insert_id = i64::try_from(result.last_insert_id())
        .ok()
        .filter(|id| *id != 0);
    Ok(ExecResult {
        rows_affected: result.rows_affected(),
        last_insert_id,
    })
}

fn bind_values<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    args: &[Value],
) -> Query<'q, MySql, MySqlArguments> {
    for value in args {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(v) => query.bind(*v),
            Value::Int(v) => query.bind(*v),
            Value::UInt(v) => query.bind(*v),
            Value::Float(v) => query.bind(*v),
            Value::String(v) => query.bind(v.clone()),
            Value::Bytes(v) => query.bind(v.clone()),
            Value::Timestamp(v) => query.bind(v.naive_utc()),
            Value::Decimal(v) => query.bind(*v),
            Value::Json(v) => query.bind(sqlx::types::Json(v.clone())),
        };
    }
    query
}

fn decode_rows(rows: &[MySqlRow]) -> Result<Vec<Record>, sqlx::Error> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let columns: Vec<(String, ColumnKind)> = first
        .columns()
        .iter()
        .map(|col| (col.name().to_string(), ColumnKind::classify(col.type_info().name())))
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

fn decode_cell(row: &MySqlRow, index: usize, kind: ColumnKind) -> Result<Value, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match kind {
        ColumnKind::Bool => Value::Bool(row.try_get(index)?),
        ColumnKind::Int(IntWidth::W8) => row.try_get::<i8, _>(index)?.into(),
        ColumnKind::Int(IntWidth::W16) => row.try_get::<i16, _>(index)?.into(),
        ColumnKind::Int(IntWidth::W32) => row.try_get::<i32, _>(index)?.into(),
        ColumnKind::Int(IntWidth::W64) => row.try_get::<i64, _>(index)?.into(),
        ColumnKind::UInt(IntWidth::W8) => row.try_get::<u8, _>(index)?.into(),
        ColumnKind::UInt(IntWidth::W16) => row.try_get::<u16, _>(index)?.into(),
        ColumnKind::UInt(IntWidth::W32) => row.try_get::<u32, _>(index)?.into(),
        ColumnKind::UInt(IntWidth::W64) => row.try_get::<u64, _>(index)?.into(),
        ColumnKind::Float(FloatWidth::F32) => row.try_get::<f32, _>(index)?.into(),
        ColumnKind::Float(FloatWidth::F64) => row.try_get::<f64, _>(index)?.into(),
        // DECIMAL travels as text on the wire
        ColumnKind::Decimal => decimal_from_text(Some(row.try_get_unchecked::<String, _>(index)?)),
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
        ColumnKind::Text | ColumnKind::Uuid | ColumnKind::Unknown => text_cell(row, index)?,
    };
    Ok(value)
}

// BLOB and binary-collated columns refuse a checked String decode
fn text_cell(row: &MySqlRow, index: usize) -> Result<Value, sqlx::Error> {
    match row.try_get::<String, _>(index) {
        Ok(text) => Ok(Value::String(text)),
        Err(_) => Ok(text_or_bytes(row.try_get_unchecked::<Vec<u8>, _>(index)?)),
    }
}
