//! In-memory reference repository.
//!
//! # Responsibility
//! - Provide a fully working repository for hosts and tests that do not
//!   bring an external storage engine.
//! - Document the unique-matching and relation-loading contract by example.
//!
//! # Invariants
//! - Stored rows are typed; erased entities are downcast on entry.
//! - Unique matching skips null candidate fields (a null never matches).

use crate::model::entity::{Entity, EntityId, EntityTypeId, UniqueGroup};
use crate::repo::{RepoError, RepoResult, Repository};
use std::cell::RefCell;
use std::collections::BTreeMap;

type RelationLoader<E> = Box<dyn Fn(&mut E)>;

/// Typed in-memory store implementing the erased repository contract.
///
/// Intended for reference use and tests; production repositories are
/// expected to live outside this crate.
pub struct MemoryRepository<E> {
    entity_type: EntityTypeId,
    rows: RefCell<Vec<E>>,
    relation_loaders: RefCell<BTreeMap<String, RelationLoader<E>>>,
}

impl<E: Entity + Clone + 'static> MemoryRepository<E> {
    pub fn new(entity_type: EntityTypeId) -> Self {
        Self {
            entity_type,
            rows: RefCell::new(Vec::new()),
            relation_loaders: RefCell::new(BTreeMap::new()),
        }
    }

    /// Registers an eager-load hook for one relation name.
    pub fn register_relation(&self, name: impl Into<String>, loader: impl Fn(&mut E) + 'static) {
        self.relation_loaders
            .borrow_mut()
            .insert(name.into(), Box::new(loader));
    }

    pub fn len(&self) -> usize {
        self.rows.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.borrow().is_empty()
    }

    /// Returns a stored row by identifier.
    pub fn find_by_id(&self, id: EntityId) -> Option<E> {
        self.rows
            .borrow()
            .iter()
            .find(|row| row.id() == Some(id))
            .cloned()
    }

    fn downcast<'a>(&self, entity: &'a dyn Entity) -> RepoResult<&'a E> {
        let actual = entity.entity_type();
        entity
            .as_any()
            .downcast_ref::<E>()
            .ok_or(RepoError::TypeMismatch {
                expected: self.entity_type.clone(),
                actual,
            })
    }

    fn group_matches(example: &dyn Entity, stored: &E, group: &UniqueGroup) -> bool {
        if group.is_empty() {
            return false;
        }
        for field in group.fields() {
            let Some(candidate) = example.attribute(field).filter(|value| !value.is_null()) else {
                return false;
            };
            let stored_value = stored.attribute(field).filter(|value| !value.is_null());
            if stored_value.as_ref() != Some(&candidate) {
                return false;
            }
        }
        true
    }
}

impl<E: Entity + Clone + 'static> Repository for MemoryRepository<E> {
    fn create(&self, entity: &mut dyn Entity) -> RepoResult<()> {
        if entity.id().is_none() {
            entity.set_id(EntityId::generate());
        }
        let id = entity.id();
        let actual = entity.entity_type();
        let concrete = entity
            .as_any_mut()
            .downcast_mut::<E>()
            .ok_or(RepoError::TypeMismatch {
                expected: self.entity_type.clone(),
                actual,
            })?;

        let mut rows = self.rows.borrow_mut();
        if rows.iter().any(|row| row.id() == id) {
            return Err(RepoError::Backend(format!(
                "duplicate id on create: {}",
                id.map(|id| id.to_string()).unwrap_or_default()
            )));
        }
        rows.push(concrete.clone());
        Ok(())
    }

    fn update(&self, entity: &dyn Entity) -> RepoResult<()> {
        let concrete = self.downcast(entity)?;
        let id = entity
            .id()
            .ok_or_else(|| RepoError::NotFound(self.entity_type.clone()))?;

        let mut rows = self.rows.borrow_mut();
        let position = rows
            .iter()
            .position(|row| row.id() == Some(id))
            .ok_or_else(|| RepoError::NotFound(self.entity_type.clone()))?;
        rows[position] = concrete.clone();
        Ok(())
    }

    fn delete_by_id(&self, id: &EntityId) -> RepoResult<()> {
        let mut rows = self.rows.borrow_mut();
        let position = rows
            .iter()
            .position(|row| row.id() == Some(*id))
            .ok_or_else(|| RepoError::NotFound(self.entity_type.clone()))?;
        rows.remove(position);
        Ok(())
    }

    fn find_one_by_unique(&self, entity: &dyn Entity) -> RepoResult<Box<dyn Entity>> {
        self.downcast(entity)?;
        let Some(groups) = entity.unique_groups() else {
            return Err(RepoError::NotFound(self.entity_type.clone()));
        };

        let rows = self.rows.borrow();
        for row in rows.iter() {
            for group in groups {
                if Self::group_matches(entity, row, group) {
                    return Ok(Box::new(row.clone()));
                }
            }
        }
        Err(RepoError::NotFound(self.entity_type.clone()))
    }

    fn load_relations(
        &self,
        entities: &mut [&mut (dyn Entity + '_)],
        with: &[String],
    ) -> RepoResult<()> {
        let loaders = self.relation_loaders.borrow();
        for relation in with {
            if !loaders.contains_key(relation) {
                return Err(RepoError::UnknownRelation {
                    entity_type: self.entity_type.clone(),
                    relation: relation.clone(),
                });
            }
        }

        for entity in entities.iter_mut() {
            let actual = entity.entity_type();
            let concrete =
                entity
                    .as_any_mut()
                    .downcast_mut::<E>()
                    .ok_or(RepoError::TypeMismatch {
                        expected: self.entity_type.clone(),
                        actual,
                    })?;
            for relation in with {
                if let Some(loader) = loaders.get(relation) {
                    loader(concrete);
                }
            }
        }
        Ok(())
    }
}
