//! SQLite generator.

use super::placeholder::PlaceholderStyle;
use super::traits::SqlDialect;
use crate::error::{TrellisError, TrellisResult};

pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Question
    }

    fn bool_literal(&self, val: bool) -> String {
        if val { "1".to_string() } else { "0".to_string() }
    }

    fn json_equals(&self, _column_sql: &str) -> TrellisResult<String> {
        Err(TrellisError::UnsupportedDialect {
            dialect: self.name(),
            operation: "JSON comparison",
        })
    }

    fn begin_statement(&self) -> &'static str {
        "BEGIN"
    }
}
