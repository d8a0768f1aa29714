//! Statement execution over sqlx pools
//!
//! Every statement is prepared on a leased connection, bound from
//! positional [`Value`]s and decoded into [`Record`]s. Writes issued without
//! an explicit transaction run inside a single-statement transaction that
//! commits on success and rolls back when dropped on error.

pub mod mysql;
pub mod postgres;
pub mod registry;
pub mod sqlite;

pub use registry::Registry;

use crate::errors::DbError;
use config::{ConnectionConfig, Driver};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{MySql, Postgres, Sqlite, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;
use type_mapping::{Record, Value};

/// Outcome of a statement that returns no rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Generated key for drivers with a last-insert-id facility
    pub last_insert_id: Option<i64>,
}

/// Connection pool for one of the supported drivers
#[derive(Debug, Clone)]
pub enum DbPool {
    MySql(MySqlPool),
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

/// Open transaction on one of the supported drivers
#[derive(Debug)]
pub enum DbTransaction {
    MySql(Transaction<'static, MySql>),
    Postgres(Transaction<'static, Postgres>),
    Sqlite(Transaction<'static, Sqlite>),
}

/// Shared transaction slot. `None` once committed or rolled back.
pub type TxHandle = Arc<Mutex<Option<DbTransaction>>>;

impl DbPool {
    /// Open a pool sized from the descriptor
    pub async fn connect(config: &ConnectionConfig, dsn: &str) -> Result<Self, DbError> {
        let max = config.max_open_conns;
        let idle = config.idle_timeout();
        let lifetime = config.max_lifetime();

        let pool = match config.driver() {
            Driver::MySql => DbPool::MySql(
                MySqlPoolOptions::new()
                    .max_connections(max)
                    .idle_timeout(idle)
                    .max_lifetime(lifetime)
                    .connect(dsn)
                    .await
                    .map_err(DbError::step("connect"))?,
            ),
            Driver::Postgres => DbPool::Postgres(
                PgPoolOptions::new()
                    .max_connections(max)
                    .idle_timeout(idle)
                    .max_lifetime(lifetime)
                    .connect(dsn)
                    .await
                    .map_err(DbError::step("connect"))?,
            ),
            Driver::Sqlite => DbPool::Sqlite(
                SqlitePoolOptions::new()
                    .max_connections(max)
                    .idle_timeout(idle)
                    .max_lifetime(lifetime)
                    .connect(dsn)
                    .await
                    .map_err(DbError::step("connect"))?,
            ),
        };
        Ok(pool)
    }

    pub fn driver(&self) -> Driver {
        match self {
            DbPool::MySql(_) => Driver::MySql,
            DbPool::Postgres(_) => Driver::Postgres,
            DbPool::Sqlite(_) => Driver::Sqlite,
        }
    }

    pub async fn begin(&self) -> Result<DbTransaction, DbError> {
        let tx = match self {
            DbPool::MySql(pool) => DbTransaction::MySql(pool.begin().await.map_err(DbError::step("begin"))?),
            DbPool::Postgres(pool) => {
                DbTransaction::Postgres(pool.begin().await.map_err(DbError::step("begin"))?)
            }
            DbPool::Sqlite(pool) => DbTransaction::Sqlite(pool.begin().await.map_err(DbError::step("begin"))?),
        };
        Ok(tx)
    }

    /// Run a read on a leased connection
    pub async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Record>, DbError> {
        match self {
            DbPool::MySql(pool) => {
                let mut conn = pool.acquire().await.map_err(DbError::step("connect"))?;
                mysql::query(&mut conn, sql, args).await
            }
            DbPool::Postgres(pool) => {
                let mut conn = pool.acquire().await.map_err(DbError::step("connect"))?;
                postgres::query(&mut conn, sql, args).await
            }
            DbPool::Sqlite(pool) => {
                let mut conn = pool.acquire().await.map_err(DbError::step("connect"))?;
                sqlite::query(&mut conn, sql, args).await
            }
        }
    }

    /// Run a write in its own transaction
    pub async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult, DbError> {
        let mut tx = self.begin().await?;
        let result = tx.execute(sql, args).await?;
        tx.commit().await?;
        Ok(result)
    }

    /// Run a row-returning write (`RETURNING`) in its own transaction
    pub async fn query_write(&self, sql: &str, args: &[Value]) -> Result<Vec<Record>, DbError> {
        let mut tx = self.begin().await?;
        let rows = tx.query(sql, args).await?;
        tx.commit().await?;
        Ok(rows)
    }

    pub async fn close(&self) {
        match self {
            DbPool::MySql(pool) => pool.close().await,
            DbPool::Postgres(pool) => pool.close().await,
            DbPool::Sqlite(pool) => pool.close().await,
        }
    }
}

impl DbTransaction {
    pub async fn query(&mut self, sql: &str, args: &[Value]) -> Result<Vec<Record>, DbError> {
        match self {
            DbTransaction::MySql(tx) => mysql::query(tx, sql, args).await,
            DbTransaction::Postgres(tx) => postgres::query(tx, sql, args).await,
            DbTransaction::Sqlite(tx) => sqlite::query(tx, sql, args).await,
        }
    }

    pub async fn execute(&mut self, sql: &str, args: &[Value]) -> Result<ExecResult, DbError> {
        match self {
            DbTransaction::MySql(tx) => mysql::execute(tx, sql, args).await,
            DbTransaction::Postgres(tx) => postgres::execute(tx, sql, args).await,
            DbTransaction::Sqlite(tx) => sqlite::execute(tx, sql, args).await,
        }
    }

    pub async fn commit(self) -> Result<(), DbError> {
        match self {
            DbTransaction::MySql(tx) => tx.commit().await,
            DbTransaction::Postgres(tx) => tx.commit().await,
            DbTransaction::Sqlite(tx) => tx.commit().await,
        }
        .map_err(DbError::step("commit"))
    }

    pub async fn rollback(self) -> Result<(), DbError> {
        match self {
            DbTransaction::MySql(tx) => tx.rollback().await,
            DbTransaction::Postgres(tx) => tx.rollback().await,
            DbTransaction::Sqlite(tx) => tx.rollback().await,
        }
        .map_err(DbError::step("rollback"))
    }

    pub fn driver(&self) -> Driver {
        match self {
            DbTransaction::MySql(_) => Driver::MySql,
            DbTransaction::Postgres(_) => Driver::Postgres,
            DbTransaction::Sqlite(_) => Driver::Sqlite,
        }
    }

    /// Wrap into a shareable handle
    pub fn into_handle(self) -> TxHandle {
        Arc::new(Mutex::new(Some(self)))
    }
}

/// Commit the transaction in `handle`. A handle that is already finished is an error.
pub async fn commit(handle: &TxHandle) -> Result<(), DbError> {
    match handle.lock().await.take() {
        Some(tx) => tx.commit().await,
        None => Err(DbError::Config("transaction already finished".to_string())),
    }
}

/// Roll back the transaction in `handle`. Rolling back a finished handle is a no-op.
pub async fn rollback(handle: &TxHandle) -> Result<(), DbError> {
    match handle.lock().await.take() {
        Some(tx) => tx.rollback().await,
        None => Ok(()),
    }
}
