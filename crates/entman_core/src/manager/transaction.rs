//! Storage backend transaction contract.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Transaction control operation, used for error reporting and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOp {
    Begin,
    Commit,
    Rollback,
}

impl TransactionOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::Commit => "commit",
            Self::Rollback => "rollback",
        }
    }
}

impl Display for TransactionOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one transaction operation on one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionError {
    pub backend_id: String,
    pub op: TransactionOp,
    pub message: String,
}

impl TransactionError {
    pub fn new(backend_id: impl Into<String>, op: TransactionOp, message: impl Into<String>) -> Self {
        Self {
            backend_id: backend_id.into(),
            op,
            message: message.into(),
        }
    }
}

impl Display for TransactionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "transaction {} failed on backend `{}`: {}",
            self.op, self.backend_id, self.message
        )
    }
}

impl Error for TransactionError {}

pub type TxnResult = Result<(), TransactionError>;

/// Opaque transactional resource coordinated by the entity manager.
///
/// Backends participate in manager-wide begin/commit/rollback propagation.
/// There is no atomicity guarantee across backends: when one backend fails,
/// earlier backends in registration order have already executed the call.
pub trait StorageBackend {
    /// Stable identifier used in logs and error reports.
    fn backend_id(&self) -> &str;

    fn begin_transaction(&self) -> TxnResult;

    fn commit_transaction(&self) -> TxnResult;

    fn rollback_transaction(&self) -> TxnResult;
}
