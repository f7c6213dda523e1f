//! Raw-row serialization into typed records.

use crate::case;
use crate::entity::EntityDef;
use crate::record::{RawRow, Record};

/// Internal annotation column carrying the owner-side key on pivot-join
/// rows; stripped from every serialized payload.
pub(crate) const PIVOT_KEY: &str = "_pivot_key";

/// Convert one raw driver row into a typed, case-converted record.
///
/// Declared columns are copied under their field names unless hidden or
/// excluded by the selection allow-list; nested structured values have
/// their keys converted at every depth; the per-column `serialize`
/// transform runs last. Columns the entity does not declare land in the
/// record's extra namespace. The source row is never mutated.
pub fn serialize_row(entity: &EntityDef, row: &RawRow, only: Option<&[String]>) -> Record {
    let mut record = Record::new();
    for (raw_name, raw_value) in row {
        if raw_name == PIVOT_KEY {
            continue;
        }
        if entity.relations().iter().any(|r| r.name() == raw_name) {
            continue;
        }
        match entity.column_by_db(raw_name) {
            Some(column) => {
                if column.is_hidden() {
                    continue;
                }
                let field = column.name();
                if let Some(allowed) = only {
                    if !allowed.iter().any(|f| f == field) {
                        continue;
                    }
                }
                let mut value = case::camel_keys(raw_value.clone());
                if let Some(transform) = column.serialize_hook() {
                    value = transform(value);
                }
                record.fields.insert(field.to_string(), value);
            }
            None => {
                record
                    .extra
                    .insert(case::to_camel(raw_name), case::camel_keys(raw_value.clone()));
            }
        }
    }
    record
}

/// Serialize a batch of rows.
pub fn serialize_rows(entity: &EntityDef, rows: &[RawRow], only: Option<&[String]>) -> Vec<Record> {
    rows.iter().map(|row| serialize_row(entity, row, only)).collect()
}

/// Serialize a row with no entity metadata: every column is a field,
/// keys case-converted.
pub fn serialize_untyped(row: &RawRow) -> Record {
    let mut record = Record::new();
    for (raw_name, raw_value) in row {
        if raw_name == PIVOT_KEY {
            continue;
        }
        record
            .fields
            .insert(case::to_camel(raw_name), case::camel_keys(raw_value.clone()));
    }
    record
}
