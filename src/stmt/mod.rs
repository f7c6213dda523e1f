//! Statement templates.
//!
//! Each generator assembles neutral-placeholder SQL from the query
//! intent (or a write payload) and the dialect strategy, then the
//! placeholder pass produces the wire form.

pub mod delete;
pub mod insert;
pub mod select;
pub mod update;

use crate::dialect::SqlDialect;
use crate::entity::EntityDef;
use crate::value::Value;

/// Field name under which a record's unmatched-column namespace travels;
/// never written back to the database.
pub const EXTRA_FIELD: &str = "extra";

/// Whether a payload key is a column at all, as opposed to the extra
/// namespace or a declared relation object.
pub(crate) fn is_writable_field(entity: &EntityDef, field: &str) -> bool {
    if field == EXTRA_FIELD {
        return false;
    }
    !entity.relations().iter().any(|r| r.name() == field)
}

/// Convert one payload cell into its placeholder marker and bind value.
///
/// Composite (object/array) values are JSON-encoded to text on dialects
/// that take them that way, or bound structurally with an explicit cast
/// token (`?::jsonb`) where the dialect requires one.
pub(crate) fn bind_cell(
    generator: &dyn SqlDialect,
    value: serde_json::Value,
) -> (String, Value) {
    let bound = Value::from_json(&value);
    if bound.is_composite() {
        if generator.encodes_json_as_text() {
            let text = serde_json::to_string(&value).unwrap_or_else(|_| String::from("null"));
            ("?".to_string(), Value::String(text))
        } else {
            (format!("?{}", generator.json_cast()), bound)
        }
    } else {
        ("?".to_string(), bound)
    }
}
