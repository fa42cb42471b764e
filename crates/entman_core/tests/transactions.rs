use entman_core::{
    BindingRegistry, EntityManager, ManagerError, PrototypeEntityFactory, RepositoryMap,
    StorageBackend, TransactionError, TransactionOp, TxnResult,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

type Journal = Rc<RefCell<Vec<String>>>;

struct RecordingBackend {
    backend_id: String,
    journal: Journal,
    fail_on: Option<TransactionOp>,
}

impl RecordingBackend {
    fn new(backend_id: &str, journal: Journal) -> Self {
        Self {
            backend_id: backend_id.to_string(),
            journal,
            fail_on: None,
        }
    }

    fn failing_on(backend_id: &str, journal: Journal, op: TransactionOp) -> Self {
        Self {
            backend_id: backend_id.to_string(),
            journal,
            fail_on: Some(op),
        }
    }

    fn record(&self, op: TransactionOp) -> TxnResult {
        self.journal
            .borrow_mut()
            .push(format!("{}:{}", self.backend_id, op));
        if self.fail_on == Some(op) {
            return Err(TransactionError::new(
                self.backend_id.clone(),
                op,
                "simulated backend failure",
            ));
        }
        Ok(())
    }
}

impl StorageBackend for RecordingBackend {
    fn backend_id(&self) -> &str {
        &self.backend_id
    }

    fn begin_transaction(&self) -> TxnResult {
        self.record(TransactionOp::Begin)
    }

    fn commit_transaction(&self) -> TxnResult {
        self.record(TransactionOp::Commit)
    }

    fn rollback_transaction(&self) -> TxnResult {
        self.record(TransactionOp::Rollback)
    }
}

fn manager() -> EntityManager {
    EntityManager::new(
        BindingRegistry::new(),
        Arc::new(RepositoryMap::new()),
        Arc::new(PrototypeEntityFactory::new()),
    )
}

#[test]
fn begin_and_commit_reach_every_backend_once_in_registration_order() {
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));
    let mut manager = manager();
    manager.add_backend(Arc::new(RecordingBackend::new("primary", journal.clone())));
    manager.add_backend(Arc::new(RecordingBackend::new("audit", journal.clone())));

    manager.begin_transaction().expect("begin should propagate");
    manager.commit_transaction().expect("commit should propagate");

    assert_eq!(
        *journal.borrow(),
        [
            "primary:begin",
            "audit:begin",
            "primary:commit",
            "audit:commit"
        ]
    );
}

#[test]
fn rollback_propagates_in_registration_order() {
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));
    let mut manager = manager();
    manager.add_backend(Arc::new(RecordingBackend::new("primary", journal.clone())));
    manager.add_backend(Arc::new(RecordingBackend::new("audit", journal.clone())));

    manager
        .rollback_transaction()
        .expect("rollback should propagate");
    assert_eq!(*journal.borrow(), ["primary:rollback", "audit:rollback"]);
}

#[test]
fn first_failing_backend_aborts_propagation() {
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));
    let mut manager = manager();
    manager.add_backend(Arc::new(RecordingBackend::new("primary", journal.clone())));
    manager.add_backend(Arc::new(RecordingBackend::failing_on(
        "flaky",
        journal.clone(),
        TransactionOp::Commit,
    )));
    manager.add_backend(Arc::new(RecordingBackend::new("audit", journal.clone())));

    manager.begin_transaction().expect("begin should propagate");

    let err = manager
        .commit_transaction()
        .expect_err("failing backend must abort commit");
    match err {
        ManagerError::Transaction(err) => {
            assert_eq!(err.backend_id, "flaky");
            assert_eq!(err.op, TransactionOp::Commit);
        }
        other => panic!("expected transaction error, got: {other}"),
    }

    // Earlier backends have already committed; the later one is never
    // reached. This is the documented multi-backend limitation.
    assert_eq!(
        *journal.borrow(),
        [
            "primary:begin",
            "flaky:begin",
            "audit:begin",
            "primary:commit",
            "flaky:commit"
        ]
    );
}

#[test]
fn manager_without_backends_accepts_transaction_calls() {
    let manager = manager();
    manager.begin_transaction().expect("no-op begin");
    manager.commit_transaction().expect("no-op commit");
    manager.rollback_transaction().expect("no-op rollback");
}
