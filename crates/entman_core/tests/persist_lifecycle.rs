use entman_core::{
    AttributeError, BindingRegistry, Entity, EntityId, EntityManager, EntityTypeId, ManagerError,
    MemoryRepository, PrototypeEntityFactory, RepositoryMap, RepositoryTypeId, UniqueGroup,
    ENTITY_ALREADY_EXISTS_MESSAGE,
};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

#[derive(Clone)]
struct Contact {
    id: Option<EntityId>,
    email: Option<String>,
    phone: Option<String>,
    name: Option<String>,
    unique: Vec<UniqueGroup>,
}

impl Contact {
    fn blank() -> Self {
        Self {
            id: None,
            email: None,
            phone: None,
            name: None,
            unique: vec![UniqueGroup::new(["email"]), UniqueGroup::new(["phone"])],
        }
    }

    fn with_email(email: &str, name: &str) -> Self {
        let mut contact = Self::blank();
        contact.email = Some(email.to_string());
        contact.name = Some(name.to_string());
        contact
    }
}

impl Entity for Contact {
    fn entity_type(&self) -> EntityTypeId {
        EntityTypeId::new("contact")
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn unique_groups(&self) -> Option<&[UniqueGroup]> {
        Some(&self.unique)
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            "email" => self.email.clone().map(Value::String),
            "phone" => self.phone.clone().map(Value::String),
            "name" => self.name.clone().map(Value::String),
            _ => None,
        }
    }

    fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), AttributeError> {
        match name {
            "email" => {
                self.email = value.as_str().map(str::to_string);
                Ok(())
            }
            "phone" => {
                self.phone = value.as_str().map(str::to_string);
                Ok(())
            }
            "name" => {
                self.name = value.as_str().map(str::to_string);
                Ok(())
            }
            _ => Err(AttributeError::UnknownAttribute {
                entity_type: self.entity_type(),
                name: name.to_string(),
            }),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct Setup {
    manager: EntityManager,
    memory: Arc<MemoryRepository<Contact>>,
}

fn setup() -> Setup {
    let memory = Arc::new(MemoryRepository::<Contact>::new(EntityTypeId::new(
        "contact",
    )));

    let mut repositories = RepositoryMap::new();
    repositories.register(RepositoryTypeId::new("contact_repo"), memory.clone());

    let mut entities = PrototypeEntityFactory::new();
    entities.register(EntityTypeId::new("contact"), || Box::new(Contact::blank()));

    let mut bindings = BindingRegistry::new();
    bindings
        .bind(
            EntityTypeId::new("contact"),
            RepositoryTypeId::new("contact_repo"),
        )
        .expect("contact binding should register");

    Setup {
        manager: EntityManager::new(bindings, Arc::new(repositories), Arc::new(entities)),
        memory,
    }
}

#[test]
fn persist_without_match_and_without_id_creates() {
    let setup = setup();
    let mut contact = Contact::with_email("a@example.com", "Alice");

    setup
        .manager
        .persist(&mut contact)
        .expect("persist should create");
    assert!(contact.id.is_some(), "create must assign an id");
    assert_eq!(setup.memory.len(), 1);
}

#[test]
fn persist_with_existing_unique_match_updates_under_matched_id() {
    let setup = setup();
    let mut stored = Contact::with_email("a@example.com", "Alice");
    setup
        .manager
        .persist(&mut stored)
        .expect("initial persist should create");
    let stored_id = stored.id.expect("stored contact has an id");

    let mut incoming = Contact::with_email("a@example.com", "Alice Smith");
    setup
        .manager
        .persist(&mut incoming)
        .expect("second persist should update");

    assert_eq!(incoming.id, Some(stored_id), "matched id must be copied");
    assert_eq!(setup.memory.len(), 1, "no second row may appear");
    let row = setup
        .memory
        .find_by_id(stored_id)
        .expect("row should remain stored");
    assert_eq!(row.name.as_deref(), Some("Alice Smith"));
}

#[test]
fn persist_with_preset_id_updates_directly() {
    let setup = setup();
    let mut contact = Contact::with_email("a@example.com", "Alice");
    setup
        .manager
        .persist(&mut contact)
        .expect("initial persist should create");

    contact.name = Some("Alice Smith".to_string());
    setup
        .manager
        .persist(&mut contact)
        .expect("persist with id should update");
    assert_eq!(setup.memory.len(), 1);
}

#[test]
fn insert_with_full_unique_match_fails_with_field_messages() {
    let setup = setup();
    let mut stored = Contact::with_email("a@example.com", "Alice");
    setup
        .manager
        .insert(&mut stored)
        .expect("first insert should create");

    let mut duplicate = Contact::with_email("a@example.com", "Impostor");
    let err = setup
        .manager
        .insert(&mut duplicate)
        .expect_err("duplicate insert must fail");

    match err {
        ManagerError::Validation(errors) => {
            assert_eq!(errors.fields(), ["email"]);
            assert_eq!(errors.messages()[0].message, ENTITY_ALREADY_EXISTS_MESSAGE);
        }
        other => panic!("expected validation error, got: {other}"),
    }
    assert_eq!(setup.memory.len(), 1, "conflicting insert must not create");
}

#[test]
fn insert_reports_only_the_matched_group_fields() {
    let setup = setup();
    let mut stored = Contact::with_email("a@example.com", "Alice");
    stored.phone = Some("555-0100".to_string());
    setup
        .manager
        .insert(&mut stored)
        .expect("first insert should create");

    // Different email, same phone: only the phone group matches.
    let mut duplicate = Contact::with_email("b@example.com", "Bob");
    duplicate.phone = Some("555-0100".to_string());
    let err = setup
        .manager
        .insert(&mut duplicate)
        .expect_err("phone conflict must fail");

    match err {
        ManagerError::Validation(errors) => assert_eq!(errors.fields(), ["phone"]),
        other => panic!("expected validation error, got: {other}"),
    }
}

#[test]
fn insert_with_null_unique_field_does_not_conflict() {
    let setup = setup();
    let mut stored = Contact::with_email("a@example.com", "Alice");
    setup
        .manager
        .insert(&mut stored)
        .expect("first insert should create");

    // No email, no phone: nothing to match on, insert proceeds.
    let mut unmatched = Contact::blank();
    unmatched.name = Some("Nameless".to_string());
    setup
        .manager
        .insert(&mut unmatched)
        .expect("null unique fields must not conflict");
    assert_eq!(setup.memory.len(), 2);
}

#[test]
fn update_delegates_without_existence_check() {
    let setup = setup();
    let mut contact = Contact::with_email("a@example.com", "Alice");
    setup
        .manager
        .persist(&mut contact)
        .expect("persist should create");

    contact.name = Some("Alice Smith".to_string());
    setup
        .manager
        .update(&contact)
        .expect("update of stored contact should succeed");

    let mut phantom = Contact::with_email("x@example.com", "Nobody");
    phantom.set_id(EntityId::generate());
    let err = setup
        .manager
        .update(&phantom)
        .expect_err("repository decides the failure for an absent entity");
    assert!(matches!(err, ManagerError::NotFound(_)));
}

#[test]
fn remove_with_id_deletes_exactly_that_entity() {
    let setup = setup();
    let mut first = Contact::with_email("a@example.com", "Alice");
    let mut second = Contact::with_email("b@example.com", "Bob");
    setup.manager.persist(&mut first).expect("first persist");
    setup.manager.persist(&mut second).expect("second persist");

    setup
        .manager
        .remove(&first)
        .expect("remove by id should succeed");
    assert_eq!(setup.memory.len(), 1);
    assert!(setup
        .memory
        .find_by_id(second.id.expect("second id"))
        .is_some());
}

#[test]
fn remove_without_id_resolves_through_unique_match() {
    let setup = setup();
    let mut stored = Contact::with_email("a@example.com", "Alice");
    setup.manager.persist(&mut stored).expect("persist");

    let example = Contact::with_email("a@example.com", "whoever");
    setup
        .manager
        .remove(&example)
        .expect("unique-matched remove should succeed");
    assert!(setup.memory.is_empty());
}

#[test]
fn remove_without_id_and_without_match_fails_with_not_found() {
    let setup = setup();
    let example = Contact::with_email("ghost@example.com", "Ghost");

    let err = setup
        .manager
        .remove(&example)
        .expect_err("removing a nonexistent unique entity must fail loudly");
    assert!(matches!(err, ManagerError::NotFound(_)));
}

#[test]
fn find_one_by_unique_returns_match_or_not_found() {
    let setup = setup();
    let mut stored = Contact::with_email("a@example.com", "Alice");
    setup.manager.persist(&mut stored).expect("persist");

    let example = Contact::with_email("a@example.com", "whoever");
    let found = setup
        .manager
        .find_one_by_unique(&example)
        .expect("matching example should find the stored contact");
    assert_eq!(found.id(), stored.id);

    let miss = Contact::with_email("ghost@example.com", "Ghost");
    let err = setup
        .manager
        .find_one_by_unique(&miss)
        .err()
        .expect("non-matching example must miss");
    assert!(matches!(err, ManagerError::NotFound(_)));
}
