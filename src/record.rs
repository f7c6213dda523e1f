//! In-memory records produced by the serializer.

use serde::Serialize;
use std::collections::BTreeMap;

pub type RawRow = serde_json::Map<String, serde_json::Value>;

/// A resolved relation attached to a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Related {
    /// hasOne / belongsTo: a single related record, if any.
    One(Option<Box<Record>>),
    /// hasMany / manyToMany: the full related group, possibly empty.
    Many(Vec<Record>),
}

/// A typed, case-converted record.
///
/// Declared columns land in `fields` under their field (camel) names.
/// Columns the entity does not declare (aggregate aliases, ad-hoc
/// projections) are kept apart in `extra` so typed fields are never
/// polluted by query-specific extras. Resolved relations are attached
/// under their declared relation names.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Record {
    #[serde(flatten)]
    pub fields: RawRow,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: RawRow,
    #[serde(flatten)]
    pub relations: BTreeMap<String, Related>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a declared field.
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.fields.get(field)
    }

    /// Write a declared field.
    pub fn set(&mut self, field: impl Into<String>, value: serde_json::Value) {
        self.fields.insert(field.into(), value);
    }

    /// Read a resolved relation.
    pub fn relation(&self, name: &str) -> Option<&Related> {
        self.relations.get(name)
    }

    /// Related records for a to-many relation, empty when unresolved.
    pub fn related_many(&self, name: &str) -> &[Record] {
        match self.relations.get(name) {
            Some(Related::Many(records)) => records,
            _ => &[],
        }
    }

    /// Related record for a to-one relation, `None` when absent or unresolved.
    pub fn related_one(&self, name: &str) -> Option<&Record> {
        match self.relations.get(name) {
            Some(Related::One(Some(record))) => Some(record),
            _ => None,
        }
    }
}
