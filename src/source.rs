//! The data source: configuration, registry, and connection opening.

use crate::builder::QueryBuilder;
use crate::dialect::Dialect;
use crate::driver::{self, Driver};
use crate::entity::Registry;
use crate::error::{TrellisError, TrellisResult};
use crate::record::RawRow;
use crate::stmt;
use crate::txn::{self, Transaction, WorkFn};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Connection configuration, consumed once at connection-open time.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub dialect: Dialect,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Database name, or the file path (or `:memory:`) for SQLite.
    pub database: String,
    /// Emit a debug event per executed statement.
    pub logging: bool,
    /// Connect attempts for connection-refused failures.
    pub connect_attempts: u32,
    /// Fixed delay between connect attempts.
    pub retry_delay: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            host: "localhost".to_string(),
            port: 0,
            username: String::new(),
            password: String::new(),
            database: String::new(),
            logging: false,
            connect_attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl SourceConfig {
    pub fn new(dialect: Dialect, database: impl Into<String>) -> Self {
        Self {
            dialect,
            database: database.into(),
            ..Default::default()
        }
    }

    fn effective_port(&self) -> u16 {
        if self.port != 0 {
            return self.port;
        }
        match self.dialect {
            Dialect::MySql | Dialect::MariaDb => 3306,
            Dialect::Postgres => 5432,
            Dialect::Sqlite => 0,
        }
    }

    /// The driver connection URL.
    pub fn url(&self) -> String {
        match self.dialect {
            Dialect::Sqlite => {
                if self.database == ":memory:" {
                    "sqlite::memory:".to_string()
                } else {
                    format!("sqlite://{}", self.database)
                }
            }
            Dialect::Postgres => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.username,
                self.password,
                self.host,
                self.effective_port(),
                self.database
            ),
            Dialect::MySql | Dialect::MariaDb => format!(
                "mysql://{}:{}@{}:{}/{}",
                self.username,
                self.password,
                self.host,
                self.effective_port(),
                self.database
            ),
        }
    }
}

/// A configured database plus its entity registry.
///
/// Pass or inject a `DataSource` explicitly; the process-wide default
/// below is opt-in and must be initialized (and cleared) deliberately.
pub struct DataSource {
    config: SourceConfig,
    registry: Registry,
}

static DEFAULT_INSTANCE: RwLock<Option<Arc<DataSource>>> = RwLock::new(None);

impl DataSource {
    pub fn new(config: SourceConfig, registry: Registry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    /// Open a new driver connection per the configuration.
    pub async fn connect(&self) -> TrellisResult<Box<dyn Driver>> {
        driver::open(
            self.config.dialect,
            &self.config.url(),
            self.config.logging,
            self.config.connect_attempts,
            self.config.retry_delay,
        )
        .await
    }

    /// A builder bound to a registered entity.
    pub fn query(&self, entity: &str) -> TrellisResult<QueryBuilder> {
        Ok(QueryBuilder::for_entity(
            self.config.dialect,
            self.registry.entity(entity)?,
        ))
    }

    /// A builder over a bare table, bypassing entity metadata.
    pub fn table(&self, table: &str) -> QueryBuilder {
        QueryBuilder::new(self.config.dialect, table)
    }

    /// Insert one or more records; returns the affected-row count.
    pub async fn insert(
        &self,
        driver: &mut dyn Driver,
        entity: &str,
        rows: &[RawRow],
    ) -> TrellisResult<u64> {
        let entity = self.registry.entity(entity)?;
        let (sql, params) = stmt::insert::build_insert(self.config.dialect, &entity, rows)?;
        driver.execute(&sql, &params).await
    }

    /// Open a connection and run the unit of work transactionally.
    pub async fn transaction<T, F>(&self, work: F) -> TrellisResult<T>
    where
        F: for<'a> FnOnce(&'a mut Transaction) -> WorkFn<'a, T>,
    {
        let driver = self.connect().await?;
        txn::with_transaction(driver, work).await
    }

    // =========================================================================
    // Opt-in process-wide default instance
    // =========================================================================

    /// Install the process-wide default instance. Fails if one is
    /// already installed; call [`DataSource::clear_default`] first to
    /// replace it.
    pub fn init_default(source: DataSource) -> TrellisResult<()> {
        let mut slot = DEFAULT_INSTANCE
            .write()
            .map_err(|_| TrellisError::Config("default instance lock poisoned".to_string()))?;
        if slot.is_some() {
            return Err(TrellisError::Config(
                "default data source is already initialized".to_string(),
            ));
        }
        *slot = Some(Arc::new(source));
        Ok(())
    }

    /// Tear down the process-wide default instance, if any.
    pub fn clear_default() {
        if let Ok(mut slot) = DEFAULT_INSTANCE.write() {
            *slot = None;
        }
    }

    /// The process-wide default instance; an error until initialized.
    pub fn try_default() -> TrellisResult<Arc<DataSource>> {
        DEFAULT_INSTANCE
            .read()
            .ok()
            .and_then(|slot| slot.clone())
            .ok_or_else(|| {
                TrellisError::Config("default data source is not initialized".to_string())
            })
    }
}
