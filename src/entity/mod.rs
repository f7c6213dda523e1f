//! Entity descriptors and the registration registry.
//!
//! Entities are registered programmatically at startup: a name, the
//! columns (with optional transforms), at most one primary key, and the
//! declared relations. Descriptors are immutable once registered and
//! live for the process lifetime behind `Arc`.

mod column;
mod registry;
mod relation;

pub use column::{ColumnDef, ColumnTransform};
pub use registry::Registry;
pub use relation::{RelationDef, RelationKind};

use crate::case;
use crate::error::{TrellisError, TrellisResult};
use std::sync::OnceLock;

/// Descriptor for one entity type mapped to one table.
#[derive(Debug, Default)]
pub struct EntityDef {
    name: String,
    table: Option<String>,
    columns: Vec<ColumnDef>,
    relations: Vec<RelationDef>,
    // Lazily computed, append-only; recomputation is idempotent.
    table_cache: OnceLock<String>,
    primary_cache: OnceLock<Option<usize>>,
}

impl EntityDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Override the default (pluralized, snake-cased) table name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Declare a one-to-one relation; `foreign_key` is the field on the
    /// target entity pointing back at this entity's primary key.
    pub fn has_one(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.relations
            .push(RelationDef::new(name, RelationKind::HasOne, target).foreign_key(foreign_key));
        self
    }

    /// Declare a one-to-many relation; `foreign_key` is the field on the
    /// target entity pointing back at this entity's primary key.
    pub fn has_many(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.relations
            .push(RelationDef::new(name, RelationKind::HasMany, target).foreign_key(foreign_key));
        self
    }

    /// Declare a many-to-one relation; `foreign_key` is the field on THIS
    /// entity holding the target's primary key.
    pub fn belongs_to(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.relations
            .push(RelationDef::new(name, RelationKind::BelongsTo, target).foreign_key(foreign_key));
        self
    }

    /// Declare a many-to-many relation through a pivot entity.
    ///
    /// `through_foreign_key` is the field on the pivot pointing at THIS
    /// entity. The target entity must carry the reciprocal declaration
    /// through the same pivot; resolution fails otherwise.
    pub fn many_to_many(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        through: impl Into<String>,
        through_foreign_key: impl Into<String>,
    ) -> Self {
        self.relations.push(
            RelationDef::new(name, RelationKind::ManyToMany, target)
                .through(through, through_foreign_key),
        );
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The mapped table name: the explicit override, or the pluralized
    /// snake-case form of the entity name.
    pub fn table_name(&self) -> &str {
        self.table_cache.get_or_init(|| {
            self.table
                .clone()
                .unwrap_or_else(|| case::table_name(&self.name))
        })
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn relations(&self) -> &[RelationDef] {
        &self.relations
    }

    /// The primary-key column, required by relation resolution.
    pub fn primary_key(&self) -> TrellisResult<&ColumnDef> {
        let idx = *self
            .primary_cache
            .get_or_init(|| self.columns.iter().position(|c| c.is_primary()));
        idx.map(|i| &self.columns[i])
            .ok_or_else(|| TrellisError::MissingPrimaryKey(self.name.clone()))
    }

    /// Look up a column by its field (camel) name.
    pub fn column_def(&self, field: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name() == field)
    }

    /// Look up a column by its database name.
    pub fn column_by_db(&self, db_name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.db_name() == db_name)
    }

    /// Database column name for a field: the declared mapping, or the
    /// snake-case conversion when the field is undeclared.
    pub fn db_column(&self, field: &str) -> String {
        self.column_def(field)
            .map(|c| c.db_name().to_string())
            .unwrap_or_else(|| case::to_snake(field))
    }

    pub fn relation(&self, name: &str) -> TrellisResult<&RelationDef> {
        self.relations
            .iter()
            .find(|r| r.name() == name)
            .ok_or_else(|| TrellisError::UnknownRelation {
                entity: self.name.clone(),
                relation: name.to_string(),
            })
    }

    /// Registration-time validation: at most one primary key.
    pub(crate) fn validate(&self) -> TrellisResult<()> {
        if self.columns.iter().filter(|c| c.is_primary()).count() > 1 {
            return Err(TrellisError::MultiplePrimaryKeys(self.name.clone()));
        }
        Ok(())
    }
}
