//! UPDATE assembly.

use super::{EXTRA_FIELD, bind_cell, is_writable_field};
use crate::builder::QueryBuilder;
use crate::case;
use crate::dialect;
use crate::error::{TrellisError, TrellisResult};
use crate::record::RawRow;
use crate::value::Value;

/// Assemble an UPDATE from the intent's accumulated WHERE and a change
/// payload.
///
/// SET parameters precede WHERE parameters so the single placeholder
/// pass yields strictly increasing indices.
pub fn build_update(query: &QueryBuilder, changes: &RawRow) -> TrellisResult<(String, Vec<Value>)> {
    query.ensure_ok()?;
    let generator = query.dialect.generator();

    let writable: Vec<(&String, &serde_json::Value)> = changes
        .iter()
        .filter(|(field, _)| match &query.entity {
            Some(entity) => is_writable_field(entity, field),
            None => field.as_str() != EXTRA_FIELD,
        })
        .collect();
    if writable.is_empty() {
        return Err(TrellisError::Config(format!(
            "update of '{}' with no values",
            query.table
        )));
    }

    let mut sql = String::from("UPDATE ");
    sql.push_str(&generator.quote_identifier(&query.table));
    sql.push_str(" SET ");

    let mut params: Vec<Value> = Vec::new();
    let mut assignments: Vec<String> = Vec::with_capacity(writable.len());
    for (field, value) in writable {
        let mut value = value.clone();
        if let Some(prepare) = query
            .entity
            .as_deref()
            .and_then(|e| e.column_def(field))
            .and_then(|c| c.prepare_hook())
        {
            value = prepare(value);
        }
        let column = match &query.entity {
            Some(entity) => entity.db_column(field),
            None => case::to_snake(field),
        };
        let (marker, bound) = bind_cell(&*generator, value);
        assignments.push(format!("{} = {}", generator.quote_identifier(&column), marker));
        params.push(bound);
    }
    sql.push_str(&assignments.join(", "));

    if !query.where_sql.is_empty() {
        sql.push(' ');
        sql.push_str(&query.where_sql);
    }
    params.extend(query.where_params.iter().cloned());

    let sql = dialect::translate(&sql, generator.placeholder_style());
    Ok((sql, params))
}
