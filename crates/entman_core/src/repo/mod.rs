//! Repository layer contract and reference implementation.
//!
//! # Responsibility
//! - Define the persistence operations every bound repository implements.
//! - Return semantic errors (`NotFound`) in addition to backend transport
//!   errors.
//!
//! # Invariants
//! - A repository resolved for an entity type accepts exactly that concrete
//!   type; anything else is a `TypeMismatch`.
//! - `find_one_by_unique` matches on the entity's declared unique-field
//!   groups and fails with `NotFound` when none match.

use crate::model::entity::{AttributeError, Entity, EntityId, EntityTypeId};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory;

pub use memory::MemoryRepository;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository persistence and lookup errors.
#[derive(Debug)]
pub enum RepoError {
    NotFound(EntityTypeId),
    TypeMismatch {
        expected: EntityTypeId,
        actual: EntityTypeId,
    },
    UnknownRelation {
        entity_type: EntityTypeId,
        relation: String,
    },
    Backend(String),
    Attribute(AttributeError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(entity_type) => write!(f, "entity not found: {entity_type}"),
            Self::TypeMismatch { expected, actual } => write!(
                f,
                "repository for `{expected}` received entity of type `{actual}`"
            ),
            Self::UnknownRelation {
                entity_type,
                relation,
            } => write!(f, "unknown relation `{relation}` on entity type `{entity_type}`"),
            Self::Backend(message) => write!(f, "storage backend failure: {message}"),
            Self::Attribute(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Attribute(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AttributeError> for RepoError {
    fn from(value: AttributeError) -> Self {
        Self::Attribute(value)
    }
}

/// Persistence operations for one bound entity type, over erased entities.
///
/// # Contract
/// - `create` assigns an identifier when the entity has none.
/// - `update` fails with `NotFound` when no stored entity carries the id.
/// - `find_one_by_unique` returns the first stored entity matching any of
///   the example's declared unique groups.
/// - `load_relations` eagerly loads the named relations onto every entity
///   in the slice.
pub trait Repository {
    fn create(&self, entity: &mut dyn Entity) -> RepoResult<()>;

    fn update(&self, entity: &dyn Entity) -> RepoResult<()>;

    fn delete_by_id(&self, id: &EntityId) -> RepoResult<()>;

    fn find_one_by_unique(&self, entity: &dyn Entity) -> RepoResult<Box<dyn Entity>>;

    fn load_relations(
        &self,
        entities: &mut [&mut (dyn Entity + '_)],
        with: &[String],
    ) -> RepoResult<()>;
}
