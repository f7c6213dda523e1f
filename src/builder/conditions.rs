//! Predicate fragment construction.

use crate::dialect::SqlDialect;
use crate::error::TrellisResult;
use crate::value::Value;

/// Comparison operators accepted by the filter family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl Operator {
    fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }
}

/// One rendered predicate: neutral-placeholder SQL plus its bound values,
/// always index-aligned.
#[derive(Debug, Default)]
pub(crate) struct Fragment {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Build a single comparison fragment.
pub(crate) fn comparison(
    generator: &dyn SqlDialect,
    column_sql: &str,
    op: Operator,
    value: Value,
) -> TrellisResult<Fragment> {
    match op {
        Operator::IsNull | Operator::IsNotNull => Ok(Fragment {
            sql: format!("{} {}", column_sql, op.symbol()),
            params: vec![],
        }),
        Operator::In => Ok(in_list(column_sql, false, vec![value])),
        Operator::NotIn => Ok(in_list(column_sql, true, vec![value])),
        // NULL comparisons degrade to IS [NOT] NULL; `= NULL` matches nothing.
        Operator::Eq if value == Value::Null => Ok(Fragment {
            sql: format!("{} IS NULL", column_sql),
            params: vec![],
        }),
        Operator::Ne if value == Value::Null => Ok(Fragment {
            sql: format!("{} IS NOT NULL", column_sql),
            params: vec![],
        }),
        // A structured value switches to the dialect's JSON comparison.
        Operator::Eq if value.is_composite() => Ok(Fragment {
            sql: generator.json_equals(column_sql)?,
            params: vec![value],
        }),
        Operator::Ne if value.is_composite() => Ok(Fragment {
            sql: format!("NOT ({})", generator.json_equals(column_sql)?),
            params: vec![value],
        }),
        _ => Ok(Fragment {
            sql: format!("{} {} ?", column_sql, op.symbol()),
            params: vec![value],
        }),
    }
}

/// Build an `IN`/`NOT IN` list with one placeholder per element.
///
/// An empty list degenerates to a constant predicate: `IN ()` is not
/// valid SQL on any target dialect.
pub(crate) fn in_list(column_sql: &str, negated: bool, values: Vec<Value>) -> Fragment {
    if values.is_empty() {
        return Fragment {
            sql: if negated { "1 = 1" } else { "1 = 0" }.to_string(),
            params: vec![],
        };
    }
    let markers = vec!["?"; values.len()].join(", ");
    Fragment {
        sql: format!(
            "{} {} ({})",
            column_sql,
            if negated { "NOT IN" } else { "IN" },
            markers
        ),
        params: values,
    }
}
