//! SQLite binding and decoding
//!
//! SQLite stores every integer as 64 bits, so integer columns are read as
//! `i64` whatever their declared width. Expression columns without a
//! declared type are classified from the storage class of each value.
//!
//! The driver only reports declared types it recognizes. A column declared
//! as `DECIMAL(p, s)` is therefore classified per value too: a
//! stored real decodes as [`Value::Float`] and a stored integer as
//! [`Value::Int`], never as [`Value::Decimal`]. `Record::get_decimal` reads
//! either form. Only a `TEXT` column keeps decimal digits exactly.

use crate::errors::DbError;
use crate::executor::ExecResult;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnection, SqliteRow};
use sqlx::{Column, Executor, Row, Sqlite, Statement, TypeInfo, ValueRef};
use type_mapping::{decimal_from_text, text_or_bytes, ColumnKind, Record, TemporalKind, Value};

pub async fn query(
    conn: &mut SqliteConnection,
    sql: &str,
    args: &[Value],
) -> Result<Vec<Record>, DbError> {
    let statement = (&mut *conn).prepare(sql).await.map_err(DbError::step("prepare"))?;
    let rows = bind_values(statement.query(), args)?
        .fetch_all(&mut *conn)
        .await
        .map_err(DbError::step("query"))?;
    decode_rows(&rows).map_err(DbError::step("decode"))
}

pub async fn execute(
    conn: &mut SqliteConnection,
    sql: &str,
    args: &[Value],
) -> Result<ExecResult, DbError> {
    let statement = (&mut *conn).prepare(sql).await.map_err(DbError::step("prepare"))?;
    let result = bind_values(statement.query(), args)?
        .execute(&mut *conn)
        .await
        .map_err(DbError::step("execute"))?;
    Ok(ExecResult {
        rows_affected: result.rows_affected(),
        last_insert_id: Some(result.last_insert_rowid()).filter(|id| *id != 0),
    })
}

fn bind_values<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    args: &[Value],
) -> Result<Query<'q, Sqlite, SqliteArguments<'q>>, DbError> {
    for value in args {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(v) => query.bind(*v),
            Value::Int(v) => query.bind(*v),
            Value::UInt(v) => query.bind(i64::try_from(*v).map_err(|_| {
                DbError::Parameter(format!("{} does not fit a SQLite integer", v))
            })?),
            Value::Float(v) => query.bind(*v),
            Value::String(v) => query.bind(v.clone()),
            Value::Bytes(v) => query.bind(v.clone()),
            Value::Timestamp(v) => query.bind(v.naive_utc()),
            Value::Decimal(v) => query.bind(v.to_string()),
            Value::Json(v) => query.bind(sqlx::types::Json(v.clone())),
        };
    }
    Ok(query)
}

fn decode_rows(rows: &[SqliteRow]) -> Result<Vec<Record>, sqlx::Error> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    // `None` defers classification to each value
    let columns: Vec<(String, Option<ColumnKind>)> = first
        .columns()
        .iter()
        .map(|col| {
            let type_name = col.type_info().name();
            let kind = (type_name != "NULL").then(|| ColumnKind::classify(type_name));
            (col.name().to_string(), kind)
        })
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

fn decode_cell(row: &SqliteRow, index: usize, kind: Option<ColumnKind>) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let kind = match kind {
        Some(kind) => kind,
        None => ColumnKind::classify(raw.type_info().name()),
    };

    let value = match kind {
        ColumnKind::Bool => Value::Bool(row.try_get(index)?),
        ColumnKind::Int(_) | ColumnKind::UInt(_) => row.try_get::<i64, _>(index)?.into(),
        ColumnKind::Float(_) => row.try_get::<f64, _>(index)?.into(),
        // NUMERIC affinity may hold an integer, a real or text
        ColumnKind::Decimal => decimal_from_text(Some(row.try_get_unchecked::<String, _>(index)?)),
        ColumnKind::Temporal(TemporalKind::Date) => match row.try_get::<NaiveDate, _>(index) {
            Ok(date) => date.into(),
            Err(_) => text_cell(row, index)?,
        },
        ColumnKind::Temporal(TemporalKind::Time) => match row.try_get::<NaiveTime, _>(index) {
            Ok(time) => time.into(),
            Err(_) => text_cell(row, index)?,
        },
        ColumnKind::Temporal(_) => match row.try_get::<DateTime<Utc>, _>(index) {
            Ok(ts) => ts.into(),
            Err(_) => match row.try_get::<NaiveDateTime, _>(index) {
                Ok(ts) => ts.into(),
                Err(_) => text_cell(row, index)?,
            },
        },
        ColumnKind::Binary => Value::Bytes(row.try_get_unchecked(index)?),
        ColumnKind::Json | ColumnKind::Text | ColumnKind::Uuid | ColumnKind::Unknown => {
            text_cell(row, index)?
        }
    };
    Ok(value)
}

fn text_cell(row: &SqliteRow, index: usize) -> Result<Value, sqlx::Error> {
    match row.try_get::<String, _>(index) {
        Ok(text) => Ok(Value::String(text)),
        Err(_) => Ok(text_or_bytes(row.try_get_unchecked::<Vec<u8>, _>(index)?)),
    }
}
