//! Transaction and connection lifecycle.
//!
//! A handle moves `unopened → active → (committed | rolledBack) →
//! released`. `active` is set only after the dialect's begin succeeds,
//! and commit/rollback are each followed unconditionally by connection
//! release, exactly once, even when the verb itself fails.

use crate::driver::Driver;
use crate::error::{TrellisError, TrellisResult};
use crate::record::RawRow;
use crate::value::Value;
use std::future::Future;
use std::pin::Pin;

/// A transaction-scoped connection handle.
///
/// Owned by exactly one logical unit of work; the `active` flag and the
/// underlying connection are not lock-protected, so a handle must never
/// be shared across concurrent chains.
pub struct Transaction {
    driver: Option<Box<dyn Driver>>,
    active: bool,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("driver", &self.driver.as_ref().map(|_| "<driver>"))
            .field("active", &self.active)
            .finish()
    }
}

impl Transaction {
    /// Begin a transaction on the driver.
    ///
    /// On a failed begin the connection is released before the error
    /// propagates; the handle never becomes active.
    pub async fn begin(mut driver: Box<dyn Driver>) -> TrellisResult<Self> {
        if let Err(err) = driver.begin().await {
            let _ = driver.close().await;
            return Err(err);
        }
        Ok(Self {
            driver: Some(driver),
            active: true,
        })
    }

    /// True only between a successful begin and a pending commit/rollback.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The underlying driver, rejected once the handle is inactive.
    pub fn driver_mut(&mut self) -> TrellisResult<&mut (dyn Driver + 'static)> {
        if !self.active {
            return Err(TrellisError::InactiveTransaction);
        }
        self.driver
            .as_deref_mut()
            .ok_or(TrellisError::InactiveTransaction)
    }

    /// Run a statement inside the transaction and return its rows.
    pub async fn fetch(&mut self, sql: &str, params: &[Value]) -> TrellisResult<Vec<RawRow>> {
        self.driver_mut()?.fetch(sql, params).await
    }

    /// Run a statement inside the transaction and return affected rows.
    pub async fn execute(&mut self, sql: &str, params: &[Value]) -> TrellisResult<u64> {
        self.driver_mut()?.execute(sql, params).await
    }

    /// Commit, then release the connection.
    pub async fn commit(&mut self) -> TrellisResult<()> {
        self.finish(true).await
    }

    /// Roll back, then release the connection.
    pub async fn rollback(&mut self) -> TrellisResult<()> {
        self.finish(false).await
    }

    async fn finish(&mut self, commit: bool) -> TrellisResult<()> {
        if !self.active {
            return Err(TrellisError::InactiveTransaction);
        }
        self.active = false;
        let mut driver = self.driver.take().ok_or(TrellisError::InactiveTransaction)?;
        let verb_result = if commit {
            driver.commit().await
        } else {
            driver.rollback().await
        };
        // Release runs whether or not the verb succeeded, and cannot run
        // twice: the handle no longer owns a driver.
        let close_result = driver.close().await;
        verb_result?;
        close_result
    }
}

/// A unit of work run inside one transaction.
pub type WorkFn<'a, T> = Pin<Box<dyn Future<Output = TrellisResult<T>> + Send + 'a>>;

/// Run a unit of work transactionally.
///
/// Begins on the driver, threads the handle through the work, commits
/// on success, and on failure rolls back, releases, and re-raises the
/// original error unchanged. A unit of work that already deactivated
/// the handle (an inner rollback) is never committed after the fact.
pub async fn with_transaction<T, F>(driver: Box<dyn Driver>, work: F) -> TrellisResult<T>
where
    F: for<'a> FnOnce(&'a mut Transaction) -> WorkFn<'a, T>,
{
    let mut tx = Transaction::begin(driver).await?;
    match work(&mut tx).await {
        Ok(value) => {
            if tx.is_active() {
                tx.commit().await?;
            }
            Ok(value)
        }
        Err(err) => {
            if tx.is_active() {
                let _ = tx.rollback().await;
            }
            Err(err)
        }
    }
}
