//! Relation metadata.

/// How two entities relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    HasOne,
    HasMany,
    BelongsTo,
    ManyToMany,
}

/// Descriptor for one declared relation.
///
/// The foreign key is interpreted per kind: for `HasOne`/`HasMany` it is
/// the field on the target entity pointing back at the owner; for
/// `BelongsTo` it is the field on the owner holding the target's primary
/// key. `ManyToMany` instead names a through (pivot) entity and the
/// pivot field pointing at the declaring side; the target entity must
/// declare the reciprocal through the same pivot.
#[derive(Debug, Clone)]
pub struct RelationDef {
    name: String,
    kind: RelationKind,
    target: String,
    foreign_key: Option<String>,
    through: Option<String>,
    through_foreign_key: Option<String>,
}

impl RelationDef {
    pub(crate) fn new(
        name: impl Into<String>,
        kind: RelationKind,
        target: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            target: target.into(),
            foreign_key: None,
            through: None,
            through_foreign_key: None,
        }
    }

    pub(crate) fn foreign_key(mut self, field: impl Into<String>) -> Self {
        self.foreign_key = Some(field.into());
        self
    }

    pub(crate) fn through(
        mut self,
        entity: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.through = Some(entity.into());
        self.through_foreign_key = Some(foreign_key.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Foreign-key field, present for every kind except `ManyToMany`.
    pub fn foreign_key_field(&self) -> Option<&str> {
        self.foreign_key.as_deref()
    }

    /// Pivot entity name for `ManyToMany`.
    pub fn through_entity(&self) -> Option<&str> {
        self.through.as_deref()
    }

    /// Pivot field pointing at the declaring side, for `ManyToMany`.
    pub fn through_foreign_key_field(&self) -> Option<&str> {
        self.through_foreign_key.as_deref()
    }
}
