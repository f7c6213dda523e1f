//! Process-lifetime registry of entity descriptors.

use super::EntityDef;
use crate::error::{TrellisError, TrellisResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry keyed by entity name, built once at startup.
#[derive(Debug, Default)]
pub struct Registry {
    entities: HashMap<String, Arc<EntityDef>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity, validating its descriptor.
    pub fn register(&mut self, entity: EntityDef) -> TrellisResult<()> {
        entity.validate()?;
        self.entities
            .insert(entity.name().to_string(), Arc::new(entity));
        Ok(())
    }

    /// Look up a registered entity.
    pub fn entity(&self, name: &str) -> TrellisResult<Arc<EntityDef>> {
        self.entities
            .get(name)
            .cloned()
            .ok_or_else(|| TrellisError::UnknownEntity(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ColumnDef;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = Registry::new();
        registry
            .register(EntityDef::new("User").column(ColumnDef::new("id").primary()))
            .unwrap();
        assert!(registry.contains("User"));
        assert_eq!(registry.entity("User").unwrap().table_name(), "users");
        assert!(matches!(
            registry.entity("Ghost"),
            Err(TrellisError::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_register_rejects_two_primaries() {
        let mut registry = Registry::new();
        let result = registry.register(
            EntityDef::new("Broken")
                .column(ColumnDef::new("a").primary())
                .column(ColumnDef::new("b").primary()),
        );
        assert!(matches!(result, Err(TrellisError::MultiplePrimaryKeys(_))));
        assert!(!registry.contains("Broken"));
    }
}
