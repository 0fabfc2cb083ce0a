//! Append-only audit trail of completed pipeline runs.
//!
//! Entries are never mutated or removed through this interface. `list`
//! returns entries in append order, which is authoritative even when
//! timestamps disagree.

pub mod json_store;
pub mod memory;

pub use json_store::JsonFileAuditStore;
pub use memory::InMemoryAuditStore;

use thiserror::Error;
use uuid::Uuid;

use crate::models::AuditEntry;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Audit log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audit log serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Case {0} is already recorded")]
    DuplicateCaseId(Uuid),

    #[error("Audit log lock poisoned")]
    LockPoisoned,
}

impl AuditError {
    /// Short, content-free label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::DuplicateCaseId(_) => "duplicate_case_id",
            Self::LockPoisoned => "lock_poisoned",
        }
    }
}

/// Durable, append-only store of audit entries.
pub trait AuditStore: Send + Sync {
    /// Record one entry. Fails if the entry could not be durably recorded
    /// or its `case_id` is already present.
    fn append(&self, entry: &AuditEntry) -> Result<(), AuditError>;

    /// All entries in append order.
    fn list(&self) -> Result<Vec<AuditEntry>, AuditError>;
}
