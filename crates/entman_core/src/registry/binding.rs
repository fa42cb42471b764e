//! Entity-type to repository-type binding table.

use crate::model::entity::{EntityTypeId, RepositoryTypeId};
use log::debug;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Binding registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    BlankEntityType,
    BlankRepositoryType(EntityTypeId),
}

impl Display for BindingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankEntityType => write!(f, "entity type id must not be blank"),
            Self::BlankRepositoryType(entity_type) => write!(
                f,
                "repository type id must not be blank for entity type `{entity_type}`"
            ),
        }
    }
}

impl Error for BindingError {}

/// Process-wide mapping from entity type to repository type.
///
/// Populated by a startup call sequence and read-only afterwards. Rebinding
/// an entity type overwrites the previous target (last write wins).
#[derive(Debug, Default, Clone)]
pub struct BindingRegistry {
    bindings: BTreeMap<EntityTypeId, RepositoryTypeId>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one binding, overwriting any previous target.
    pub fn bind(
        &mut self,
        entity_type: EntityTypeId,
        repository_type: RepositoryTypeId,
    ) -> Result<(), BindingError> {
        if entity_type.is_blank() {
            return Err(BindingError::BlankEntityType);
        }
        if repository_type.is_blank() {
            return Err(BindingError::BlankRepositoryType(entity_type));
        }

        if let Some(previous) = self.bindings.insert(entity_type.clone(), repository_type.clone())
        {
            debug!(
                "event=binding_replaced module=registry entity_type={} old={} new={}",
                entity_type, previous, repository_type
            );
        }
        Ok(())
    }

    /// Pure lookup, no side effects.
    pub fn resolve(&self, entity_type: &EntityTypeId) -> Option<&RepositoryTypeId> {
        self.bindings.get(entity_type)
    }

    /// Full table, primarily for introspection and fallback search.
    pub fn config(&self) -> &BTreeMap<EntityTypeId, RepositoryTypeId> {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Returns bound entity types in sorted order.
    pub fn entity_types(&self) -> Vec<EntityTypeId> {
        self.bindings.keys().cloned().collect()
    }
}
