//! Instantiation seams between the manager and the hosting container.
//!
//! # Responsibility
//! - Define the narrow factory traits the manager resolves instances
//!   through.
//! - Provide map-backed reference implementations for hosts without a
//!   dependency container.

use crate::model::entity::{Entity, EntityTypeId, RepositoryTypeId};
use crate::repo::Repository;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Factory resolution errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactoryError {
    UnknownRepositoryType(RepositoryTypeId),
    UnknownEntityType(EntityTypeId),
}

impl Display for FactoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownRepositoryType(repository_type) => {
                write!(f, "no repository registered for type `{repository_type}`")
            }
            Self::UnknownEntityType(entity_type) => {
                write!(f, "no entity constructor registered for type `{entity_type}`")
            }
        }
    }
}

impl Error for FactoryError {}

/// Resolves repository type identifiers to live repository instances.
pub trait RepositoryFactory {
    fn get(&self, repository_type: &RepositoryTypeId) -> Result<Arc<dyn Repository>, FactoryError>;
}

/// Produces blank entity instances for attribute-based construction.
pub trait EntityFactory {
    fn create(&self, entity_type: &EntityTypeId) -> Result<Box<dyn Entity>, FactoryError>;
}

/// Map-backed repository factory holding shared repository handles.
#[derive(Default)]
pub struct RepositoryMap {
    repositories: BTreeMap<RepositoryTypeId, Arc<dyn Repository>>,
}

impl RepositoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one repository handle, overwriting any previous one.
    pub fn register(&mut self, repository_type: RepositoryTypeId, repository: Arc<dyn Repository>) {
        self.repositories.insert(repository_type, repository);
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}

impl RepositoryFactory for RepositoryMap {
    fn get(&self, repository_type: &RepositoryTypeId) -> Result<Arc<dyn Repository>, FactoryError> {
        self.repositories
            .get(repository_type)
            .cloned()
            .ok_or_else(|| FactoryError::UnknownRepositoryType(repository_type.clone()))
    }
}

type EntityConstructor = Box<dyn Fn() -> Box<dyn Entity>>;

/// Map-backed entity factory keyed by entity type.
#[derive(Default)]
pub struct PrototypeEntityFactory {
    constructors: BTreeMap<EntityTypeId, EntityConstructor>,
}

impl PrototypeEntityFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the blank-instance constructor for one entity type.
    pub fn register(
        &mut self,
        entity_type: EntityTypeId,
        constructor: impl Fn() -> Box<dyn Entity> + 'static,
    ) {
        self.constructors.insert(entity_type, Box::new(constructor));
    }
}

impl EntityFactory for PrototypeEntityFactory {
    fn create(&self, entity_type: &EntityTypeId) -> Result<Box<dyn Entity>, FactoryError> {
        let constructor = self
            .constructors
            .get(entity_type)
            .ok_or_else(|| FactoryError::UnknownEntityType(entity_type.clone()))?;
        Ok(constructor())
    }
}
