//! Naming-convention conversion between entity fields and columns.
//!
//! Entity fields use lower camel case, database columns use snake case.
//! Conversions are pure and round-trip: `firstName ↔ first_name`.

use convert_case::{Case, Casing};

/// Convert a field name to its database column form.
pub fn to_snake(name: &str) -> String {
    name.to_case(Case::Snake)
}

/// Convert a column name to its entity field form.
pub fn to_camel(name: &str) -> String {
    name.to_case(Case::Camel)
}

/// Pluralize an English-ish table name.
pub fn pluralize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix('y') {
        // "category" -> "categories", but "day" -> "days"
        let keeps_y = stem
            .chars()
            .last()
            .map(|c| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'))
            .unwrap_or(false);
        if !keeps_y {
            return format!("{}ies", stem);
        }
    }
    if name.ends_with('s') || name.ends_with('x') || name.ends_with("ch") || name.ends_with("sh") {
        return format!("{}es", name);
    }
    format!("{}s", name)
}

/// Default table name for an entity: pluralized snake case of its name.
pub fn table_name(entity: &str) -> String {
    pluralize(&to_snake(entity))
}

/// Recursively convert the keys of nested structured values to camel case.
///
/// Scalars and arrays of scalars pass through untouched; object keys are
/// converted at every depth.
pub fn camel_keys(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .map(|(k, v)| (to_camel(&k), camel_keys(v)))
                .collect(),
        ),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(camel_keys).collect())
        }
        scalar => scalar,
    }
}
