//! PostgreSQL generator.

use super::placeholder::PlaceholderStyle;
use super::traits::SqlDialect;
use crate::error::TrellisResult;

pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Numbered
    }

    fn bool_literal(&self, val: bool) -> String {
        val.to_string()
    }

    fn json_equals(&self, column_sql: &str) -> TrellisResult<String> {
        Ok(format!("{}::jsonb = ?::jsonb", column_sql))
    }

    fn json_cast(&self) -> &'static str {
        "::jsonb"
    }

    fn encodes_json_as_text(&self) -> bool {
        false
    }

    fn begin_statement(&self) -> &'static str {
        "BEGIN"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_escapes_double_quote() {
        assert_eq!(PostgresDialect.quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_json_equals_casts() {
        assert_eq!(
            PostgresDialect.json_equals("\"data\"").unwrap(),
            "\"data\"::jsonb = ?::jsonb"
        );
    }
}
