//! Generic entity-manager persistence facade.
//!
//! Routes create/update/delete/unique-lookup/relation-load operations for
//! arbitrary domain entity types to type-bound repositories, resolved
//! through a configurable binding table, and coordinates begin/commit/
//! rollback across registered storage backends.

pub mod factory;
pub mod logging;
pub mod manager;
pub mod model;
pub mod registry;
pub mod repo;

pub use factory::{
    EntityFactory, FactoryError, PrototypeEntityFactory, RepositoryFactory, RepositoryMap,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use manager::entity_manager::{
    EntityManager, FieldMessage, ManagerError, ManagerResult, ValidationErrors,
    ENTITY_ALREADY_EXISTS_MESSAGE,
};
pub use manager::transaction::{StorageBackend, TransactionError, TransactionOp, TxnResult};
pub use model::entity::{
    assign_attributes, AttributeError, AttributeMap, Entity, EntityCollection, EntityId,
    EntityTypeId, RepositoryTypeId, UniqueGroup,
};
pub use registry::binding::{BindingError, BindingRegistry};
pub use registry::definitions::{ContainerDefinitions, StaticDefinitions};
pub use repo::{MemoryRepository, RepoError, RepoResult, Repository};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
