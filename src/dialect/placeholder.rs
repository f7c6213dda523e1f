//! Neutral-placeholder translation.
//!
//! The builder always emits the neutral `?` marker. At finalization the
//! marker is rewritten for the target dialect: left as `?` for
//! MySQL/MariaDB/SQLite, rewritten to `$1`, `$2`, … for Postgres in a
//! single left-to-right pass. Quoted spans (string literals, double- or
//! backtick-quoted identifiers) are never rewritten.

/// Wire format of bound-parameter markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// Repeated `?` (MySQL, MariaDB, SQLite).
    Question,
    /// Incrementing `$N`, 1-based (Postgres).
    Numbered,
}

/// The neutral placeholder marker emitted by the builder.
pub const NEUTRAL: char = '?';

#[derive(Clone, Copy, PartialEq)]
enum Span {
    Plain,
    Single,
    Double,
    Backtick,
}

/// Translate neutral placeholders into the dialect's wire format.
pub fn translate(sql: &str, style: PlaceholderStyle) -> String {
    if style == PlaceholderStyle::Question {
        return sql.to_string();
    }
    let mut out = String::with_capacity(sql.len() + 8);
    let mut span = Span::Plain;
    let mut index = 0usize;
    for ch in sql.chars() {
        match (span, ch) {
            (Span::Plain, NEUTRAL) => {
                index += 1;
                out.push('$');
                out.push_str(&index.to_string());
                continue;
            }
            (Span::Plain, '\'') => span = Span::Single,
            (Span::Plain, '"') => span = Span::Double,
            (Span::Plain, '`') => span = Span::Backtick,
            (Span::Single, '\'') => span = Span::Plain,
            (Span::Double, '"') => span = Span::Plain,
            (Span::Backtick, '`') => span = Span::Plain,
            _ => {}
        }
        out.push(ch);
    }
    out
}

/// Count neutral placeholders outside quoted spans.
///
/// At execution time this count always equals the parameter list length.
pub fn count_placeholders(sql: &str) -> usize {
    let mut span = Span::Plain;
    let mut count = 0usize;
    for ch in sql.chars() {
        match (span, ch) {
            (Span::Plain, NEUTRAL) => count += 1,
            (Span::Plain, '\'') => span = Span::Single,
            (Span::Plain, '"') => span = Span::Double,
            (Span::Plain, '`') => span = Span::Backtick,
            (Span::Single, '\'') => span = Span::Plain,
            (Span::Double, '"') => span = Span::Plain,
            (Span::Backtick, '`') => span = Span::Plain,
            _ => {}
        }
    }
    count
}
