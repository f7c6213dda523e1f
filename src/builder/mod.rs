//! The fluent query builder.
//!
//! A `QueryBuilder` is the mutable, per-call-chain query intent: it
//! accumulates clause fragments and the positional parameter list, and
//! renders dialect-correct SQL on demand. Instances are never shared
//! across call chains; nested predicate groups are built on independent
//! child builders and spliced back synchronously.

mod conditions;
mod exec;

pub use conditions::Operator;

use crate::case;
use crate::dialect::{self, Dialect};
use crate::entity::EntityDef;
use crate::error::{TrellisError, TrellisResult};
use crate::stmt;
use crate::value::Value;
use std::sync::Arc;

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Select items that look like expressions pass through unescaped.
const EXPRESSION_KEYWORDS: &[&str] = &[
    "COUNT", "SUM", "AVG", "MIN", "MAX", "DISTINCT", "CASE", "COALESCE", "CAST", "NULLIF",
    "LOWER", "UPPER",
];

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    pub(crate) dialect: Dialect,
    pub(crate) entity: Option<Arc<EntityDef>>,
    pub(crate) table: String,
    pub(crate) distinct: bool,
    pub(crate) select_items: Vec<String>,
    pub(crate) selected_fields: Vec<String>,
    pub(crate) select_has_star: bool,
    pub(crate) joins: Vec<String>,
    pub(crate) where_sql: String,
    pub(crate) where_params: Vec<Value>,
    pub(crate) group_items: Vec<String>,
    pub(crate) having_sql: String,
    pub(crate) having_params: Vec<Value>,
    pub(crate) order_items: Vec<String>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) relations: Vec<String>,
    // First configuration error hit by a fluent call; raised at render
    // time, always before any network call.
    pub(crate) error: Option<TrellisError>,
}

impl QueryBuilder {
    /// A builder over a bare table name.
    pub fn new(dialect: Dialect, table: impl Into<String>) -> Self {
        Self {
            dialect,
            entity: None,
            table: table.into(),
            distinct: false,
            select_items: vec![],
            selected_fields: vec![],
            select_has_star: false,
            joins: vec![],
            where_sql: String::new(),
            where_params: vec![],
            group_items: vec![],
            having_sql: String::new(),
            having_params: vec![],
            order_items: vec![],
            limit: None,
            offset: None,
            relations: vec![],
            error: None,
        }
    }

    /// A builder bound to a registered entity; the table name, column
    /// mappings, and relation metadata come from the descriptor.
    pub fn for_entity(dialect: Dialect, entity: Arc<EntityDef>) -> Self {
        let mut builder = Self::new(dialect, entity.table_name());
        builder.entity = Some(entity);
        builder
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    // =========================================================================
    // SELECT
    // =========================================================================

    /// Replace the select clause.
    ///
    /// `*` passes through verbatim. `table.column` keeps the table part
    /// as written and case-converts/quotes the column part. Items with a
    /// call, an `AS` alias, or a leading SQL keyword are raw expressions
    /// and pass through unescaped.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.select_items.clear();
        self.selected_fields.clear();
        self.select_has_star = false;
        for column in columns {
            self.push_select(column.as_ref());
        }
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    fn push_select(&mut self, item: &str) {
        let item = item.trim();
        if item == "*" {
            self.select_items.push("*".to_string());
            self.select_has_star = true;
            return;
        }
        if is_expression(item) {
            self.select_items.push(item.to_string());
            return;
        }
        let generator = self.dialect.generator();
        if let Some((table, column)) = item.split_once('.') {
            if column == "*" {
                self.select_items.push(item.to_string());
                self.select_has_star = true;
            } else {
                self.select_items.push(format!(
                    "{}.{}",
                    table,
                    generator.quote_identifier(&self.db_column(column))
                ));
                self.selected_fields.push(case::to_camel(column));
            }
        } else {
            self.select_items
                .push(generator.quote_identifier(&self.db_column(item)));
            self.selected_fields.push(case::to_camel(item));
        }
    }

    /// The explicit column allow-list for serialization, if one applies.
    pub(crate) fn field_allow_list(&self) -> Option<&[String]> {
        if self.select_has_star || self.selected_fields.is_empty() {
            None
        } else {
            Some(&self.selected_fields)
        }
    }

    // =========================================================================
    // WHERE
    // =========================================================================

    /// Add a predicate with an `AND` connective. The first predicate on
    /// an empty intent renders as a bare `WHERE`.
    pub fn filter(mut self, column: &str, op: Operator, value: impl Into<Value>) -> Self {
        self.push_filter("AND", column, op, value.into());
        self
    }

    /// Add a predicate with an `OR` connective.
    pub fn or_filter(mut self, column: &str, op: Operator, value: impl Into<Value>) -> Self {
        self.push_filter("OR", column, op, value.into());
        self
    }

    /// `column IN (…)`, one placeholder per element.
    pub fn filter_in<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let fragment = conditions::in_list(
            &self.column_sql(column),
            false,
            values.into_iter().map(Into::into).collect(),
        );
        self.append_where("AND", fragment);
        self
    }

    /// `column NOT IN (…)`.
    pub fn filter_not_in<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let fragment = conditions::in_list(
            &self.column_sql(column),
            true,
            values.into_iter().map(Into::into).collect(),
        );
        self.append_where("AND", fragment);
        self
    }

    /// `IN` over an already-rendered column reference; used by the
    /// relation engine for pivot-qualified keys.
    pub(crate) fn filter_in_prequoted(mut self, column_sql: &str, values: Vec<Value>) -> Self {
        let fragment = conditions::in_list(column_sql, false, values);
        self.append_where("AND", fragment);
        self
    }

    pub fn filter_null(self, column: &str) -> Self {
        self.filter(column, Operator::IsNull, Value::Null)
    }

    pub fn filter_not_null(self, column: &str) -> Self {
        self.filter(column, Operator::IsNotNull, Value::Null)
    }

    /// Nested predicate group with an `AND` connective: the closure
    /// receives an independent child builder; its predicate tree is
    /// parenthesized and spliced back, parameters and all.
    pub fn filter_group(self, build: impl FnOnce(QueryBuilder) -> QueryBuilder) -> Self {
        self.push_group("AND", build)
    }

    /// Nested predicate group with an `OR` connective.
    pub fn or_filter_group(self, build: impl FnOnce(QueryBuilder) -> QueryBuilder) -> Self {
        self.push_group("OR", build)
    }

    fn push_filter(&mut self, connective: &str, column: &str, op: Operator, value: Value) {
        let generator = self.dialect.generator();
        let column_sql = self.column_sql(column);
        match conditions::comparison(&*generator, &column_sql, op, value) {
            Ok(fragment) => self.append_where(connective, fragment),
            Err(err) => self.fail(err),
        }
    }

    fn append_where(&mut self, connective: &str, fragment: conditions::Fragment) {
        if self.where_sql.is_empty() {
            self.where_sql = format!("WHERE {}", fragment.sql);
        } else {
            self.where_sql
                .push_str(&format!(" {} {}", connective, fragment.sql));
        }
        self.where_params.extend(fragment.params);
    }

    fn push_group(mut self, connective: &str, build: impl FnOnce(QueryBuilder) -> QueryBuilder) -> Self {
        let mut child = QueryBuilder::new(self.dialect, self.table.clone());
        child.entity = self.entity.clone();
        let child = build(child);
        if let Some(err) = child.error {
            self.fail(err);
            return self;
        }
        // The child's first predicate carries the leading keyword; strip
        // exactly that one before parenthesizing.
        let Some(inner) = child.where_sql.strip_prefix("WHERE ") else {
            return self;
        };
        self.append_where(
            connective,
            conditions::Fragment {
                sql: format!("({})", inner),
                params: child.where_params,
            },
        );
        self
    }

    // =========================================================================
    // JOIN
    // =========================================================================

    pub fn join(mut self, table: &str, left: &str, right: &str) -> Self {
        self.push_join("INNER", table, left, right);
        self
    }

    pub fn left_join(mut self, table: &str, left: &str, right: &str) -> Self {
        self.push_join("LEFT", table, left, right);
        self
    }

    /// Literal join fragment for shapes the builder cannot express.
    pub fn join_raw(mut self, fragment: &str) -> Self {
        self.joins.push(fragment.to_string());
        self
    }

    fn push_join(&mut self, kind: &str, table: &str, left: &str, right: &str) {
        let generator = self.dialect.generator();
        let base = self.table.clone();
        let left_sql = self.join_side(left, &base);
        let right_sql = self.join_side(right, table);
        self.joins.push(format!(
            "{} JOIN {} ON {} = {}",
            kind,
            generator.quote_identifier(table),
            left_sql,
            right_sql
        ));
    }

    /// A join operand: `table.column` or a bare column qualified with the
    /// given default table.
    fn join_side(&self, reference: &str, default_table: &str) -> String {
        let generator = self.dialect.generator();
        let (table, column) = reference
            .split_once('.')
            .unwrap_or((default_table, reference));
        format!(
            "{}.{}",
            generator.quote_identifier(table),
            generator.quote_identifier(&case::to_snake(column))
        )
    }

    // =========================================================================
    // GROUP / HAVING / ORDER / LIMIT
    // =========================================================================

    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for column in columns {
            let item = column.as_ref();
            let rendered = if is_expression(item) {
                item.to_string()
            } else {
                self.column_sql(item)
            };
            self.group_items.push(rendered);
        }
        self
    }

    /// HAVING predicate; fragments chain with `AND`.
    pub fn having(mut self, column: &str, op: Operator, value: impl Into<Value>) -> Self {
        let generator = self.dialect.generator();
        let column_sql = if is_expression(column) {
            column.to_string()
        } else {
            self.column_sql(column)
        };
        match conditions::comparison(&*generator, &column_sql, op, value.into()) {
            Ok(fragment) => {
                if self.having_sql.is_empty() {
                    self.having_sql = format!("HAVING {}", fragment.sql);
                } else {
                    self.having_sql.push_str(&format!(" AND {}", fragment.sql));
                }
                self.having_params.extend(fragment.params);
            }
            Err(err) => self.fail(err),
        }
        self
    }

    pub fn order_by(mut self, column: &str, order: SortOrder) -> Self {
        let direction = match order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let rendered = if is_expression(column) {
            column.to_string()
        } else {
            self.column_sql(column)
        };
        self.order_items.push(format!("{} {}", rendered, direction));
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    // =========================================================================
    // Relations
    // =========================================================================

    /// Request a declared relation to be fetched and merged after the
    /// main query. One extra query per relation, regardless of row count.
    pub fn with(mut self, relation: &str) -> Self {
        if !self.relations.iter().any(|r| r == relation) {
            self.relations.push(relation.to_string());
        }
        self
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// The assembled statement with neutral placeholders, pre-translation.
    pub fn neutral_sql(&self) -> TrellisResult<String> {
        self.ensure_ok()?;
        stmt::select::build_select(self)
    }

    /// Render dialect-correct SQL plus the aligned parameter list.
    pub fn render(&self) -> TrellisResult<(String, Vec<Value>)> {
        let neutral = self.neutral_sql()?;
        let style = self.dialect.generator().placeholder_style();
        Ok((dialect::translate(&neutral, style), self.collected_params()))
    }

    /// Parameters in clause order: WHERE before HAVING, matching the
    /// placeholder order of the rendered statement.
    pub(crate) fn collected_params(&self) -> Vec<Value> {
        let mut params = self.where_params.clone();
        params.extend(self.having_params.iter().cloned());
        params
    }

    pub(crate) fn ensure_ok(&self) -> TrellisResult<()> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn fail(&mut self, err: TrellisError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Database column text for a predicate reference: `table.column`
    /// splits and quotes both parts, a bare column is mapped through the
    /// entity descriptor (or snake-cased) and quoted.
    pub(crate) fn column_sql(&self, reference: &str) -> String {
        let generator = self.dialect.generator();
        if let Some((table, column)) = reference.split_once('.') {
            return format!(
                "{}.{}",
                generator.quote_identifier(table),
                generator.quote_identifier(&case::to_snake(column))
            );
        }
        generator.quote_identifier(&self.db_column(reference))
    }

    fn db_column(&self, field: &str) -> String {
        match &self.entity {
            Some(entity) => entity.db_column(field),
            None => case::to_snake(field),
        }
    }
}

/// Whether a select/group/order item is a raw SQL expression.
fn is_expression(item: &str) -> bool {
    if item.contains('(') {
        return true;
    }
    let upper = item.to_uppercase();
    if upper.contains(" AS ") {
        return true;
    }
    EXPRESSION_KEYWORDS
        .iter()
        .any(|kw| upper.starts_with(kw) && upper[kw.len()..].starts_with(' '))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn mysql(table: &str) -> QueryBuilder {
        QueryBuilder::new(Dialect::MySql, table)
    }

    fn postgres(table: &str) -> QueryBuilder {
        QueryBuilder::new(Dialect::Postgres, table)
    }

    #[test]
    fn test_select_star_default() {
        let (sql, params) = mysql("users").render().unwrap();
        assert_eq!(sql, "SELECT * FROM `users`");
        assert!(params.is_empty());
    }

    #[test]
    fn test_select_columns_converted() {
        let (sql, _) = mysql("users")
            .select(["id", "firstName"])
            .render()
            .unwrap();
        assert_eq!(sql, "SELECT `id`, `first_name` FROM `users`");
    }

    #[test]
    fn test_select_qualified_preserves_table() {
        let (sql, _) = postgres("users")
            .select(["users.firstName"])
            .render()
            .unwrap();
        assert_eq!(sql, "SELECT users.\"first_name\" FROM \"users\"");
    }

    #[test]
    fn test_select_expression_passthrough() {
        let (sql, _) = mysql("orders")
            .select(["COUNT(*) AS total"])
            .render()
            .unwrap();
        assert_eq!(sql, "SELECT COUNT(*) AS total FROM `orders`");
    }

    #[test]
    fn test_first_filter_bare_where() {
        let (sql, params) = mysql("users")
            .filter("active", Operator::Eq, true)
            .render()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM `users` WHERE `active` = ?");
        assert_eq!(params, vec![Value::Bool(true)]);
    }

    #[test]
    fn test_connectives_after_first() {
        let (sql, params) = mysql("users")
            .filter("active", Operator::Eq, true)
            .filter("age", Operator::Gte, 18)
            .or_filter("role", Operator::Eq, "admin")
            .render()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM `users` WHERE `active` = ? AND `age` >= ? OR `role` = ?"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_nested_group_strips_one_keyword() {
        let (sql, params) = mysql("users")
            .filter("active", Operator::Eq, true)
            .filter_group(|q| {
                q.filter("role", Operator::Eq, "admin")
                    .or_filter("role", Operator::Eq, "owner")
            })
            .render()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM `users` WHERE `active` = ? AND (`role` = ? OR `role` = ?)"
        );
        assert_eq!(
            params,
            vec![
                Value::Bool(true),
                Value::String("admin".into()),
                Value::String("owner".into())
            ]
        );
    }

    #[test]
    fn test_group_as_first_predicate() {
        let (sql, _) = mysql("users")
            .filter_group(|q| {
                q.filter("a", Operator::Eq, 1).or_filter("b", Operator::Eq, 2)
            })
            .render()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM `users` WHERE (`a` = ? OR `b` = ?)");
    }

    #[test]
    fn test_empty_group_is_noop() {
        let (sql, _) = mysql("users").filter_group(|q| q).render().unwrap();
        assert_eq!(sql, "SELECT * FROM `users`");
    }

    #[test]
    fn test_postgres_numbering() {
        let (sql, params) = postgres("users")
            .filter("age", Operator::Gt, 21)
            .filter_in("role", ["admin", "owner"])
            .render()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM \"users\" WHERE \"age\" > $1 AND \"role\" IN ($2, $3)"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_placeholder_alignment() {
        let query = mysql("users")
            .filter("a", Operator::Eq, 1)
            .filter_in("b", [1, 2, 3])
            .having("COUNT(*)", Operator::Gt, 1)
            .group_by(["a"]);
        let neutral = query.neutral_sql().unwrap();
        assert_eq!(
            crate::dialect::count_placeholders(&neutral),
            query.collected_params().len()
        );
    }

    #[test]
    fn test_join_forms() {
        let (sql, _) = mysql("users")
            .left_join("posts", "id", "posts.userId")
            .render()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM `users` LEFT JOIN `posts` ON `users`.`id` = `posts`.`user_id`"
        );
    }

    #[test]
    fn test_join_raw() {
        let (sql, _) = mysql("users")
            .join_raw("INNER JOIN ledger USING (entry_id)")
            .render()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM `users` INNER JOIN ledger USING (entry_id)"
        );
    }

    #[test]
    fn test_clause_order() {
        let (sql, _) = mysql("orders")
            .select(["status", "COUNT(*) AS total"])
            .filter("paid", Operator::Eq, true)
            .group_by(["status"])
            .having("COUNT(*)", Operator::Gt, 5)
            .order_by("status", SortOrder::Asc)
            .limit(10)
            .offset(20)
            .render()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT `status`, COUNT(*) AS total FROM `orders` WHERE `paid` = ? \
             GROUP BY `status` HAVING COUNT(*) > ? ORDER BY `status` ASC LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn test_having_params_follow_where_params() {
        let query = mysql("orders")
            .filter("paid", Operator::Eq, true)
            .group_by(["status"])
            .having("COUNT(*)", Operator::Gt, 5);
        let params = query.collected_params();
        assert_eq!(params, vec![Value::Bool(true), Value::Int(5)]);
    }

    #[test]
    fn test_json_filter_sqlite_errors_at_render() {
        let query = QueryBuilder::new(Dialect::Sqlite, "events")
            .filter("payload", Operator::Eq, json!({"kind": "click"}));
        let err = query.render().unwrap_err();
        assert!(matches!(
            err,
            TrellisError::UnsupportedDialect {
                dialect: "sqlite",
                ..
            }
        ));
    }

    #[test]
    fn test_json_filter_mysql() {
        let (sql, params) = mysql("events")
            .filter("payload", Operator::Eq, json!({"kind": "click"}))
            .render()
            .unwrap();
        assert!(sql.contains("JSON_EXTRACT(`payload`, '$')"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_distinct() {
        let (sql, _) = mysql("users").distinct().select(["role"]).render().unwrap();
        assert_eq!(sql, "SELECT DISTINCT `role` FROM `users`");
    }

    #[test]
    fn test_allow_list_tracking() {
        let query = mysql("users").select(["id", "firstName"]);
        assert_eq!(
            query.field_allow_list().unwrap(),
            &["id".to_string(), "firstName".to_string()]
        );
        let star = mysql("users").select(["*"]);
        assert!(star.field_allow_list().is_none());
    }
}
