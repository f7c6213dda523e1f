//! Column metadata.

use crate::case;

/// Per-column value hook.
///
/// `serialize` hooks run on read, after case conversion; `prepare` hooks
/// run on write, before parameter binding. Plain function pointers keep
/// descriptors `Debug + Clone` and registration fully programmatic.
pub type ColumnTransform = fn(serde_json::Value) -> serde_json::Value;

/// Descriptor for one column of an entity.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    name: String,
    column: Option<String>,
    hidden: bool,
    primary: bool,
    serialize: Option<ColumnTransform>,
    prepare: Option<ColumnTransform>,
}

impl ColumnDef {
    /// A column declared under its field (camel) name; the database name
    /// defaults to the snake-case conversion.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: None,
            hidden: false,
            primary: false,
            serialize: None,
            prepare: None,
        }
    }

    /// Override the database column name.
    pub fn db(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Hidden columns are dropped from serialized records.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Mark as the primary key. At most one per entity.
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Transform applied to the value on read, last in the pipeline.
    pub fn serialize(mut self, transform: ColumnTransform) -> Self {
        self.serialize = Some(transform);
        self
    }

    /// Transform applied to the value on write, before binding.
    pub fn prepare(mut self, transform: ColumnTransform) -> Self {
        self.prepare = Some(transform);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The mapped database column name.
    pub fn db_name(&self) -> String {
        self.column
            .clone()
            .unwrap_or_else(|| case::to_snake(&self.name))
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn serialize_hook(&self) -> Option<ColumnTransform> {
        self.serialize
    }

    pub fn prepare_hook(&self) -> Option<ColumnTransform> {
        self.prepare
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_db_name_default() {
        assert_eq!(ColumnDef::new("firstName").db_name(), "first_name");
        assert_eq!(ColumnDef::new("id").db_name(), "id");
    }

    #[test]
    fn test_db_name_override() {
        assert_eq!(ColumnDef::new("legacy").db("LEGACY_COL").db_name(), "LEGACY_COL");
    }

    #[test]
    fn test_hooks() {
        fn upper(v: serde_json::Value) -> serde_json::Value {
            match v {
                serde_json::Value::String(s) => json!(s.to_uppercase()),
                other => other,
            }
        }
        let col = ColumnDef::new("name").serialize(upper);
        let hook = col.serialize_hook().unwrap();
        assert_eq!(hook(json!("ada")), json!("ADA"));
        assert!(col.prepare_hook().is_none());
    }
}
