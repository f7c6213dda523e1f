//! DELETE assembly.

use crate::builder::QueryBuilder;
use crate::dialect;
use crate::error::TrellisResult;
use crate::value::Value;

/// Assemble a DELETE from the intent's accumulated WHERE.
pub fn build_delete(query: &QueryBuilder) -> TrellisResult<(String, Vec<Value>)> {
    query.ensure_ok()?;
    let generator = query.dialect.generator();

    let mut sql = String::from("DELETE FROM ");
    sql.push_str(&generator.quote_identifier(&query.table));
    if !query.where_sql.is_empty() {
        sql.push(' ');
        sql.push_str(&query.where_sql);
    }

    let sql = dialect::translate(&sql, generator.placeholder_style());
    Ok((sql, query.where_params.clone()))
}
