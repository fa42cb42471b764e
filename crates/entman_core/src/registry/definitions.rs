//! Container definitions seam for the alias-fallback lookup.

use crate::model::entity::EntityTypeId;
use std::collections::BTreeMap;

/// Abstract-to-concrete entity type definitions exposed by an external
/// container.
///
/// Only the alias fallback in repository resolution reads this table: when a
/// concrete entity type carries no direct binding, the manager searches the
/// definitions for an entry whose value equals the concrete type and retries
/// under the matching key.
pub trait ContainerDefinitions {
    /// Full abstract-to-concrete definitions table.
    fn definitions(&self) -> &BTreeMap<EntityTypeId, EntityTypeId>;
}

/// Map-backed definitions for hosts without a dependency container.
#[derive(Debug, Default, Clone)]
pub struct StaticDefinitions {
    definitions: BTreeMap<EntityTypeId, EntityTypeId>,
}

impl StaticDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one abstract-to-concrete definition.
    pub fn define(&mut self, abstract_type: EntityTypeId, concrete_type: EntityTypeId) {
        self.definitions.insert(abstract_type, concrete_type);
    }
}

impl ContainerDefinitions for StaticDefinitions {
    fn definitions(&self) -> &BTreeMap<EntityTypeId, EntityTypeId> {
        &self.definitions
    }
}
