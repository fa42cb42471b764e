//! Entity contract, identifier newtypes and attribute access.
//!
//! # Responsibility
//! - Provide opaque, order-stable identifiers for entity and repository types.
//! - Define the dyn-safe `Entity` trait the manager and repositories share.
//!
//! # Invariants
//! - `EntityId` is stable once assigned and never reused for another entity.
//! - Attribute values use `serde_json::Value` as the single exchange currency.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque identifier for a domain entity type.
///
/// The value is trim-normalized at construction so lookups never depend on
/// incidental whitespace in configuration input.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityTypeId(String);

impl EntityTypeId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the identifier is empty after normalization.
    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for EntityTypeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityTypeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Opaque identifier for a repository type, resolvable through a factory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RepositoryTypeId(String);

impl RepositoryTypeId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for RepositoryTypeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RepositoryTypeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Stable identifier assigned to an entity on first persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for EntityId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered group of field names whose combined value must be unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueGroup {
    fields: Vec<String>,
}

impl UniqueGroup {
    pub fn new(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Named attribute values applied to a blank entity instance.
///
/// `BTreeMap` keeps iteration deterministic for logging and tests.
pub type AttributeMap = BTreeMap<String, Value>;

/// Ordered, owned collection of erased entities.
pub type EntityCollection = Vec<Box<dyn Entity>>;

/// Attribute access failures raised by entity implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    UnknownAttribute {
        entity_type: EntityTypeId,
        name: String,
    },
    IncompatibleValue {
        entity_type: EntityTypeId,
        name: String,
        detail: String,
    },
}

impl Display for AttributeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownAttribute { entity_type, name } => {
                write!(f, "unknown attribute `{name}` on entity type `{entity_type}`")
            }
            Self::IncompatibleValue {
                entity_type,
                name,
                detail,
            } => write!(
                f,
                "incompatible value for attribute `{name}` on entity type `{entity_type}`: {detail}"
            ),
        }
    }
}

impl Error for AttributeError {}

/// Dyn-safe contract every managed domain object implements.
///
/// # Contract
/// - `entity_type` is constant for all instances of one concrete type.
/// - `id` is `None` until persistence assigns an identifier.
/// - `unique_groups` is an explicit optional capability; `None` means the
///   type declares no uniqueness constraints at all.
/// - `attribute`/`set_attribute` expose the settable-field map used for
///   construction and uniqueness comparison. Unknown names fail with
///   `AttributeError::UnknownAttribute`.
pub trait Entity {
    fn entity_type(&self) -> EntityTypeId;

    fn id(&self) -> Option<EntityId>;

    fn set_id(&mut self, id: EntityId);

    fn unique_groups(&self) -> Option<&[UniqueGroup]> {
        None
    }

    fn attribute(&self, name: &str) -> Option<Value>;

    fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), AttributeError>;

    /// Downcast hook so typed repositories can recover the concrete type.
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Applies every attribute in `attributes` to `entity` by name.
///
/// Fails on the first unknown or incompatible attribute, leaving earlier
/// assignments in place.
pub fn assign_attributes(
    entity: &mut dyn Entity,
    attributes: &AttributeMap,
) -> Result<(), AttributeError> {
    for (name, value) in attributes {
        entity.set_attribute(name, value.clone())?;
    }
    Ok(())
}
