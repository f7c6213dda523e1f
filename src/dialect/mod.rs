//! SQL dialects and the strategy trait behind the generic builder.
//!
//! One builder serves every dialect; everything dialect-specific
//! (identifier quoting, placeholder style, JSON comparison, transaction
//! verbs) lives behind [`SqlDialect`].

pub mod mysql;
pub mod placeholder;
pub mod postgres;
pub mod sqlite;
pub mod traits;

pub use placeholder::{PlaceholderStyle, count_placeholders, translate};
pub use traits::SqlDialect;

use mysql::MySqlDialect;
use postgres::PostgresDialect;
use sqlite::SqliteDialect;

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    MariaDb,
    Postgres,
    Sqlite,
}

impl Default for Dialect {
    fn default() -> Self {
        Self::Postgres
    }
}

impl Dialect {
    /// The strategy implementation for this dialect. MariaDB shares the
    /// MySQL generator.
    pub fn generator(&self) -> Box<dyn SqlDialect> {
        match self {
            Dialect::MySql | Dialect::MariaDb => Box::new(MySqlDialect),
            Dialect::Postgres => Box::new(PostgresDialect),
            Dialect::Sqlite => Box::new(SqliteDialect),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::MariaDb => "mariadb",
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
