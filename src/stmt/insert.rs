//! INSERT assembly.

use super::{bind_cell, is_writable_field};
use crate::dialect::{self, Dialect};
use crate::entity::EntityDef;
use crate::error::{TrellisError, TrellisResult};
use crate::record::RawRow;
use crate::value::Value;

/// Assemble a (possibly multi-row) INSERT.
///
/// The column list comes from the first row; later rows bind NULL for
/// any key they omit. The extra namespace and relation-named keys are
/// dropped, and per-column `prepare` transforms run before binding.
pub fn build_insert(
    dialect: Dialect,
    entity: &EntityDef,
    rows: &[RawRow],
) -> TrellisResult<(String, Vec<Value>)> {
    if rows.is_empty() {
        return Err(TrellisError::Config(format!(
            "insert into '{}' with no rows",
            entity.name()
        )));
    }

    let generator = dialect.generator();

    let fields: Vec<&String> = rows[0]
        .keys()
        .filter(|field| is_writable_field(entity, field))
        .collect();
    if fields.is_empty() {
        return Err(TrellisError::Config(format!(
            "insert into '{}' with no writable columns",
            entity.name()
        )));
    }

    let mut sql = String::from("INSERT INTO ");
    sql.push_str(&generator.quote_identifier(entity.table_name()));
    sql.push_str(" (");
    sql.push_str(
        &fields
            .iter()
            .map(|f| generator.quote_identifier(&entity.db_column(f)))
            .collect::<Vec<_>>()
            .join(", "),
    );
    sql.push_str(") VALUES ");

    let mut params: Vec<Value> = Vec::new();
    let mut groups: Vec<String> = Vec::with_capacity(rows.len());
    for row in rows {
        let mut markers: Vec<String> = Vec::with_capacity(fields.len());
        for field in &fields {
            let mut value = row.get(*field).cloned().unwrap_or(serde_json::Value::Null);
            if let Some(prepare) = entity.column_def(field).and_then(|c| c.prepare_hook()) {
                value = prepare(value);
            }
            let (marker, bound) = bind_cell(&*generator, value);
            markers.push(marker);
            params.push(bound);
        }
        groups.push(format!("({})", markers.join(", ")));
    }
    sql.push_str(&groups.join(", "));

    let sql = dialect::translate(&sql, generator.placeholder_style());
    Ok((sql, params))
}
