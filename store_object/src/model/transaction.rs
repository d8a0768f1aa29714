//! Transactions

use super::Model;
use crate::errors::DbError;
use crate::executor::{self, TxHandle};
use std::future::Future;
use tracing::warn;

impl Model {
    /// Open a transaction on the primary. Finish it with
    /// [`executor::commit`] or [`executor::rollback`]; dropping the last
    /// handle rolls it back.
    pub async fn begin(&self) -> Result<TxHandle, DbError> {
        let bound = self.bound()?;
        let tx = self.guard(bound.pool.begin()).await?;
        crate::debug_log!(table = %self.config.table, "transaction started");
        Ok(tx.into_handle())
    }

    /// Run `f` inside a transaction. Commits when `f` succeeds and rolls back
    /// when it fails. Inside an already bound transaction `f` joins it and
    /// the outer owner decides the outcome.
    pub async fn transaction<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(TxHandle, Model) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<DbError>,
    {
        if let Some(tx) = &self.scope.tx {
            return f(tx.clone(), self.clone()).await;
        }

        let tx = self.begin().await?;
        match f(tx.clone(), self.with_tx(tx.clone())).await {
            Ok(value) => {
                // `f` may have finished the transaction itself
                if tx.lock().await.is_some() {
                    executor::commit(&tx).await?;
                }
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = executor::rollback(&tx).await {
                    warn!(table = %self.config.table, error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
