//! The dialect strategy interface.

use super::placeholder::PlaceholderStyle;
use crate::error::TrellisResult;

/// Everything the generic builder needs to know about one dialect.
///
/// Methods that a dialect cannot support return a configuration error
/// naming the dialect and the operation; there is no silent fallback.
pub trait SqlDialect {
    /// Dialect family name, used in error messages.
    fn name(&self) -> &'static str;

    /// Quote an identifier, escaping embedded quote characters.
    fn quote_identifier(&self, name: &str) -> String;

    /// How neutral placeholders are rendered on the wire.
    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Boolean literal text.
    fn bool_literal(&self, val: bool) -> String;

    /// LIMIT/OFFSET clause, leading space included when non-empty.
    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        let mut sql = String::new();
        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }
        if let Some(n) = offset {
            sql.push_str(&format!(" OFFSET {}", n));
        }
        sql
    }

    /// Equality comparison between a JSON column and a bound structured
    /// value. The returned fragment contains exactly one neutral
    /// placeholder for the value.
    fn json_equals(&self, column_sql: &str) -> TrellisResult<String>;

    /// Cast token appended after a placeholder bound to a structured
    /// value in write statements; empty when the dialect takes the value
    /// as encoded text instead.
    fn json_cast(&self) -> &'static str {
        ""
    }

    /// Whether structured values must be JSON-encoded to text before
    /// binding.
    fn encodes_json_as_text(&self) -> bool {
        true
    }

    /// Statement text for the three logical transaction operations.
    fn begin_statement(&self) -> &'static str;
    fn commit_statement(&self) -> &'static str {
        "COMMIT"
    }
    fn rollback_statement(&self) -> &'static str {
        "ROLLBACK"
    }
}
