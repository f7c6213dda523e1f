//! SELECT assembly.

use crate::builder::QueryBuilder;
use crate::error::TrellisResult;

/// Assemble the SELECT statement with neutral placeholders.
///
/// Clause order is fixed: select, from, joins, where, group by, having,
/// order by, limit/offset.
pub fn build_select(query: &QueryBuilder) -> TrellisResult<String> {
    let generator = query.dialect.generator();

    let mut sql = if query.distinct {
        String::from("SELECT DISTINCT ")
    } else {
        String::from("SELECT ")
    };

    if query.select_items.is_empty() {
        sql.push('*');
    } else {
        sql.push_str(&query.select_items.join(", "));
    }

    sql.push_str(" FROM ");
    sql.push_str(&generator.quote_identifier(&query.table));

    for join in &query.joins {
        sql.push(' ');
        sql.push_str(join);
    }

    if !query.where_sql.is_empty() {
        sql.push(' ');
        sql.push_str(&query.where_sql);
    }

    if !query.group_items.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&query.group_items.join(", "));
    }

    if !query.having_sql.is_empty() {
        sql.push(' ');
        sql.push_str(&query.having_sql);
    }

    if !query.order_items.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&query.order_items.join(", "));
    }

    sql.push_str(&generator.limit_offset(query.limit, query.offset));

    Ok(sql)
}
