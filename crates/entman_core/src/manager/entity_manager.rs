//! Entity manager: repository resolution and persistence dispatch.
//!
//! # Responsibility
//! - Resolve the repository bound to an entity type (direct binding first,
//!   alias-via-definitions fallback second).
//! - Dispatch create/update/delete/unique-lookup/relation-load operations.
//!
//! # Invariants
//! - The manager never touches storage itself; every operation delegates to
//!   the resolved repository.
//! - Uniqueness conflicts are checked only inside `insert`.

use crate::factory::{EntityFactory, FactoryError, RepositoryFactory};
use crate::manager::transaction::{StorageBackend, TransactionError, TransactionOp};
use crate::model::entity::{
    assign_attributes, AttributeError, AttributeMap, Entity, EntityCollection, EntityTypeId,
};
use crate::registry::binding::BindingRegistry;
use crate::registry::definitions::ContainerDefinitions;
use crate::repo::{RepoError, Repository};
use log::{debug, error, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Conflict message attached to each field of a failed uniqueness pre-check.
///
/// Message translation is a host concern; this is the untranslated default.
pub const ENTITY_ALREADY_EXISTS_MESSAGE: &str = "Entity already exists.";

/// One field-level validation message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMessage {
    pub field: String,
    pub message: String,
}

/// Aggregated field-level validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    messages: Vec<FieldMessage>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one message for one field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.messages.push(FieldMessage {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn messages(&self) -> &[FieldMessage] {
        &self.messages
    }

    /// Field names in insertion order.
    pub fn fields(&self) -> Vec<&str> {
        self.messages
            .iter()
            .map(|message| message.field.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for FieldMessage { field, message } in &self.messages {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;

/// Entity manager error taxonomy.
#[derive(Debug)]
pub enum ManagerError {
    /// No repository bound for the entity type, directly or via alias.
    Configuration(EntityTypeId),
    /// Unique- or id-keyed lookup missed.
    NotFound(EntityTypeId),
    /// Uniqueness pre-check matched an existing entity on the named fields.
    AlreadyExists {
        entity_type: EntityTypeId,
        fields: Vec<String>,
    },
    /// Field-level validation messages derived from a uniqueness conflict.
    Validation(ValidationErrors),
    Repo(RepoError),
    Factory(FactoryError),
    Attribute(AttributeError),
    Transaction(TransactionError),
}

impl Display for ManagerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(entity_type) => {
                write!(f, "no repository bound for entity type `{entity_type}`")
            }
            Self::NotFound(entity_type) => write!(f, "entity not found: {entity_type}"),
            Self::AlreadyExists {
                entity_type,
                fields,
            } => write!(
                f,
                "entity of type `{entity_type}` already exists (matched fields: {})",
                fields.join(", ")
            ),
            Self::Validation(errors) => write!(f, "validation failed: {errors}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Factory(err) => write!(f, "{err}"),
            Self::Attribute(err) => write!(f, "{err}"),
            Self::Transaction(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ManagerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Factory(err) => Some(err),
            Self::Attribute(err) => Some(err),
            Self::Transaction(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ManagerError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(entity_type) => Self::NotFound(entity_type),
            RepoError::Attribute(err) => Self::Attribute(err),
            other => Self::Repo(other),
        }
    }
}

impl From<FactoryError> for ManagerError {
    fn from(value: FactoryError) -> Self {
        Self::Factory(value)
    }
}

impl From<AttributeError> for ManagerError {
    fn from(value: AttributeError) -> Self {
        Self::Attribute(value)
    }
}

impl From<TransactionError> for ManagerError {
    fn from(value: TransactionError) -> Self {
        Self::Transaction(value)
    }
}

/// Persistence facade routing entity operations to type-bound repositories.
///
/// Constructed explicitly with its collaborators; there is no process-wide
/// singleton. The binding registry and backend list are configured at
/// startup and read-only afterwards.
pub struct EntityManager {
    bindings: BindingRegistry,
    repositories: Arc<dyn RepositoryFactory>,
    entities: Arc<dyn EntityFactory>,
    definitions: Option<Arc<dyn ContainerDefinitions>>,
    backends: Vec<Arc<dyn StorageBackend>>,
}

impl EntityManager {
    pub fn new(
        bindings: BindingRegistry,
        repositories: Arc<dyn RepositoryFactory>,
        entities: Arc<dyn EntityFactory>,
    ) -> Self {
        Self {
            bindings,
            repositories,
            entities,
            definitions: None,
            backends: Vec::new(),
        }
    }

    /// Attaches the container definitions table used by the alias fallback.
    pub fn with_definitions(mut self, definitions: Arc<dyn ContainerDefinitions>) -> Self {
        self.definitions = Some(definitions);
        self
    }

    /// Appends one storage backend to the transaction propagation list.
    pub fn add_backend(&mut self, backend: Arc<dyn StorageBackend>) {
        self.backends.push(backend);
    }

    pub fn bindings(&self) -> &BindingRegistry {
        &self.bindings
    }

    /// Resolves the repository bound to `entity_type`.
    ///
    /// Resolution is two-step: a direct registry lookup first; on a miss,
    /// the container definitions are scanned for an entry whose value equals
    /// `entity_type` and the matching key is retried as an alias. Direct
    /// bindings always win.
    ///
    /// # Errors
    /// - `ManagerError::Configuration` when neither path yields a binding,
    ///   including the case where the alias itself is unbound.
    pub fn get_repository(&self, entity_type: &EntityTypeId) -> ManagerResult<Arc<dyn Repository>> {
        let repository_type = match self.bindings.resolve(entity_type) {
            Some(found) => found.clone(),
            None => {
                let alias = self
                    .find_in_definitions(entity_type)
                    .ok_or_else(|| ManagerError::Configuration(entity_type.clone()))?;
                self.bindings
                    .resolve(&alias)
                    .cloned()
                    .ok_or_else(|| ManagerError::Configuration(entity_type.clone()))?
            }
        };
        debug!(
            "event=repository_resolved module=manager entity_type={} repository_type={}",
            entity_type, repository_type
        );
        Ok(self.repositories.get(&repository_type)?)
    }

    fn find_in_definitions(&self, entity_type: &EntityTypeId) -> Option<EntityTypeId> {
        let definitions = self.definitions.as_ref()?;
        definitions
            .definitions()
            .iter()
            .find(|(_, concrete)| *concrete == entity_type)
            .map(|(abstract_type, _)| abstract_type.clone())
    }

    fn repository_for(&self, entity: &dyn Entity) -> ManagerResult<Arc<dyn Repository>> {
        self.get_repository(&entity.entity_type())
    }

    /// Saves an entity as an idempotent upsert.
    ///
    /// When the entity declares uniqueness groups and a stored match exists,
    /// the matched identifier is copied onto the entity first. The entity is
    /// then created when it has no identifier, updated otherwise.
    pub fn persist(&self, entity: &mut dyn Entity) -> ManagerResult<()> {
        let repository = self.repository_for(entity)?;
        self.persist_via_repository(entity, repository.as_ref())
    }

    /// `persist` against an already-resolved repository.
    pub fn persist_via_repository(
        &self,
        entity: &mut dyn Entity,
        repository: &dyn Repository,
    ) -> ManagerResult<()> {
        let has_unique = entity
            .unique_groups()
            .is_some_and(|groups| !groups.is_empty());
        if has_unique {
            match repository.find_one_by_unique(entity) {
                Ok(existing) => {
                    if let Some(id) = existing.id() {
                        entity.set_id(id);
                    }
                }
                Err(RepoError::NotFound(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }

        if entity.id().is_none() {
            debug!(
                "event=persist module=manager entity_type={} path=create",
                entity.entity_type()
            );
            repository.create(entity)?;
        } else {
            debug!(
                "event=persist module=manager entity_type={} path=update",
                entity.entity_type()
            );
            repository.update(entity)?;
        }
        Ok(())
    }

    /// Creates an entity after a uniqueness pre-check.
    ///
    /// A stored entity matching one of the declared unique groups fails the
    /// call with `ManagerError::Validation`, carrying one message per
    /// matched field. Unlike `persist`, a conflict never turns into an
    /// update.
    pub fn insert(&self, entity: &mut dyn Entity) -> ManagerResult<()> {
        match self.check_unique_exists(entity) {
            Ok(()) => {}
            Err(ManagerError::AlreadyExists {
                entity_type,
                fields,
            }) => {
                warn!(
                    "event=insert_conflict module=manager entity_type={} fields={}",
                    entity_type,
                    fields.join(",")
                );
                let mut errors = ValidationErrors::new();
                for field in fields {
                    errors.add(field, ENTITY_ALREADY_EXISTS_MESSAGE);
                }
                return Err(ManagerError::Validation(errors));
            }
            Err(err) => return Err(err),
        }

        let repository = self.repository_for(entity)?;
        repository.create(entity)?;
        Ok(())
    }

    /// Fails with `AlreadyExists` when a stored entity matches one of the
    /// declared unique groups on all fields, with nulls never matching.
    fn check_unique_exists(&self, entity: &dyn Entity) -> ManagerResult<()> {
        let Some(groups) = entity.unique_groups() else {
            return Ok(());
        };
        if groups.is_empty() {
            return Ok(());
        }

        let existing = match self.find_one_by_unique(entity) {
            Ok(found) => found,
            Err(ManagerError::NotFound(_)) => return Ok(()),
            Err(err) => return Err(err),
        };

        for group in groups {
            if group.is_empty() {
                continue;
            }
            let mut matched_fields = Vec::with_capacity(group.fields().len());
            let mut is_match = true;
            for field in group.fields() {
                let candidate = non_null(entity.attribute(field));
                let stored = non_null(existing.attribute(field));
                match (candidate, stored) {
                    (Some(candidate), Some(stored)) if candidate == stored => {
                        matched_fields.push(field.clone());
                    }
                    _ => {
                        is_match = false;
                        break;
                    }
                }
            }
            if is_match {
                return Err(ManagerError::AlreadyExists {
                    entity_type: entity.entity_type(),
                    fields: matched_fields,
                });
            }
        }
        Ok(())
    }

    /// Delegates an update without any existence pre-check.
    pub fn update(&self, entity: &dyn Entity) -> ManagerResult<()> {
        let repository = self.repository_for(entity)?;
        repository.update(entity)?;
        Ok(())
    }

    /// Deletes an entity by identifier, or by unique match when it carries
    /// none.
    ///
    /// # Errors
    /// - `ManagerError::NotFound` when the entity has no identifier and no
    ///   stored entity matches its unique groups, or when the match itself
    ///   carries no identifier.
    pub fn remove(&self, entity: &dyn Entity) -> ManagerResult<()> {
        let repository = self.repository_for(entity)?;
        match entity.id() {
            Some(id) => repository.delete_by_id(&id)?,
            None => {
                let existing = repository.find_one_by_unique(entity)?;
                let id = existing
                    .id()
                    .ok_or_else(|| ManagerError::NotFound(entity.entity_type()))?;
                repository.delete_by_id(&id)?;
            }
        }
        Ok(())
    }

    /// Finds the stored entity matching the example's unique groups.
    pub fn find_one_by_unique(&self, entity: &dyn Entity) -> ManagerResult<Box<dyn Entity>> {
        let repository = self.repository_for(entity)?;
        Ok(repository.find_one_by_unique(entity)?)
    }

    /// Eagerly loads the named relations onto every entity in the slice.
    ///
    /// An empty slice is a no-op. The repository is resolved from the first
    /// element's type; mixed-type slices surface the repository's own
    /// type-mismatch error.
    pub fn load_entity_relations(
        &self,
        entities: &mut [&mut (dyn Entity + '_)],
        with: &[String],
    ) -> ManagerResult<()> {
        let Some(first) = entities.first() else {
            return Ok(());
        };
        let entity_type = first.entity_type();
        let repository = self.get_repository(&entity_type)?;
        repository.load_relations(entities, with)?;
        Ok(())
    }

    /// Relation loading for a single entity, normalized into a one-element
    /// slice.
    pub fn load_relations_for(
        &self,
        entity: &mut (dyn Entity + '_),
        with: &[String],
    ) -> ManagerResult<()> {
        let mut entities = [entity];
        self.load_entity_relations(&mut entities, with)
    }

    /// Relation loading for an owned entity collection.
    pub fn load_collection_relations(
        &self,
        collection: &mut EntityCollection,
        with: &[String],
    ) -> ManagerResult<()> {
        let mut entities: Vec<_> = collection
            .iter_mut()
            .map(|entity| &mut **entity)
            .collect();
        self.load_entity_relations(&mut entities, with)
    }

    /// Constructs a blank entity and applies attributes by name.
    ///
    /// Pure construction; nothing is persisted.
    pub fn create_entity(
        &self,
        entity_type: &EntityTypeId,
        attributes: &AttributeMap,
    ) -> ManagerResult<Box<dyn Entity>> {
        let mut entity = self.entities.create(entity_type)?;
        if !attributes.is_empty() {
            assign_attributes(entity.as_mut(), attributes)?;
        }
        Ok(entity)
    }

    /// Maps attribute dictionaries through `create_entity`, preserving input
    /// order.
    pub fn create_entity_collection(
        &self,
        entity_type: &EntityTypeId,
        items: &[AttributeMap],
    ) -> ManagerResult<EntityCollection> {
        let mut collection = EntityCollection::with_capacity(items.len());
        for item in items {
            collection.push(self.create_entity(entity_type, item)?);
        }
        Ok(collection)
    }

    /// Begins a transaction on every backend in registration order.
    ///
    /// The first failing backend aborts propagation; backends earlier in the
    /// list have already begun. No atomicity across backends is provided.
    pub fn begin_transaction(&self) -> ManagerResult<()> {
        self.propagate(TransactionOp::Begin)
    }

    /// Commits on every backend in registration order (same failure model
    /// as `begin_transaction`).
    pub fn commit_transaction(&self) -> ManagerResult<()> {
        self.propagate(TransactionOp::Commit)
    }

    /// Rolls back on every backend in registration order (same failure model
    /// as `begin_transaction`).
    pub fn rollback_transaction(&self) -> ManagerResult<()> {
        self.propagate(TransactionOp::Rollback)
    }

    fn propagate(&self, op: TransactionOp) -> ManagerResult<()> {
        for backend in &self.backends {
            let result = match op {
                TransactionOp::Begin => backend.begin_transaction(),
                TransactionOp::Commit => backend.commit_transaction(),
                TransactionOp::Rollback => backend.rollback_transaction(),
            };
            if let Err(err) = result {
                error!(
                    "event=transaction_failed module=manager op={} backend={} error={}",
                    op,
                    backend.backend_id(),
                    err
                );
                return Err(err.into());
            }
            debug!(
                "event=transaction_propagated module=manager op={} backend={}",
                op,
                backend.backend_id()
            );
        }
        Ok(())
    }
}

fn non_null(value: Option<Value>) -> Option<Value> {
    value.filter(|value| !value.is_null())
}
