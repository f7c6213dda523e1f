//! The driver contract and the sqlx-backed dialect drivers.
//!
//! The compiler depends on nothing below this contract: connect,
//! fetch/execute with positional parameters, the three transaction
//! verbs, and close. One implementation per dialect wraps a raw sqlx
//! connection and converts rows to field-name → value maps.

pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use mysql::MySqlDriver;
pub use postgres::PostgresDriver;
pub use sqlite::SqliteDriver;

use crate::dialect::Dialect;
use crate::error::{TrellisError, TrellisResult};
use crate::record::RawRow;
use crate::value::Value;
use async_trait::async_trait;
use std::time::Duration;

/// Minimal execute/query contract per dialect.
#[async_trait]
pub trait Driver: Send {
    fn dialect(&self) -> Dialect;

    /// Run a statement and return its rows.
    async fn fetch(&mut self, sql: &str, params: &[Value]) -> TrellisResult<Vec<RawRow>>;

    /// Run a statement and return the affected-row count.
    async fn execute(&mut self, sql: &str, params: &[Value]) -> TrellisResult<u64>;

    async fn begin(&mut self) -> TrellisResult<()>;
    async fn commit(&mut self) -> TrellisResult<()>;
    async fn rollback(&mut self) -> TrellisResult<()>;

    /// Release the underlying connection. Safe to call once only; the
    /// lifecycle manager guarantees that.
    async fn close(self: Box<Self>) -> TrellisResult<()>;
}

/// Only this failure class is retried during connect.
pub(crate) fn is_connection_refused(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Io(io) if io.kind() == std::io::ErrorKind::ConnectionRefused)
}

/// Open a driver for the dialect.
///
/// Connection-refused failures are retried with a fixed delay up to
/// `attempts`; every other failure propagates immediately.
pub async fn open(
    dialect: Dialect,
    url: &str,
    logging: bool,
    attempts: u32,
    retry_delay: Duration,
) -> TrellisResult<Box<dyn Driver>> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match connect_once(dialect, url, logging).await {
            Ok(driver) => return Ok(driver),
            Err(err) if is_connection_refused(&err) && attempt < attempts => {
                tracing::debug!(
                    target: "trellis::driver",
                    attempt,
                    dialect = %dialect,
                    "connection refused, retrying"
                );
                attempt += 1;
                tokio::time::sleep(retry_delay).await;
            }
            Err(err) => return Err(TrellisError::Connection(err.to_string())),
        }
    }
}

async fn connect_once(
    dialect: Dialect,
    url: &str,
    logging: bool,
) -> Result<Box<dyn Driver>, sqlx::Error> {
    let driver: Box<dyn Driver> = match dialect {
        Dialect::MySql | Dialect::MariaDb => {
            Box::new(MySqlDriver::connect(url, logging).await?)
        }
        Dialect::Postgres => Box::new(PostgresDriver::connect(url, logging).await?),
        Dialect::Sqlite => Box::new(SqliteDriver::connect(url, logging).await?),
    };
    Ok(driver)
}
