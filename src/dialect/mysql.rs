//! MySQL/MariaDB generator.

use super::placeholder::PlaceholderStyle;
use super::traits::SqlDialect;
use crate::error::TrellisResult;

pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Question
    }

    fn bool_literal(&self, val: bool) -> String {
        if val { "1".to_string() } else { "0".to_string() }
    }

    fn json_equals(&self, column_sql: &str) -> TrellisResult<String> {
        // Unquote both sides so document equality ignores key order quirks
        // the textual form would trip over.
        Ok(format!(
            "JSON_UNQUOTE(JSON_EXTRACT({}, '$')) = JSON_UNQUOTE(JSON_EXTRACT(?, '$'))",
            column_sql
        ))
    }

    fn begin_statement(&self) -> &'static str {
        "START TRANSACTION"
    }
}
