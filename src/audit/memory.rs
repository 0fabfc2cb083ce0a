use std::sync::Mutex;

use super::{AuditError, AuditStore};
use crate::models::AuditEntry;

/// Process-local audit store. Nothing survives a restart.
#[derive(Default)]
pub struct InMemoryAuditStore {
    entries: Mutex<Vec<AuditEntry>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditStore for InMemoryAuditStore {
    fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut entries = self.entries.lock().map_err(|_| AuditError::LockPoisoned)?;
        if entries.iter().any(|e| e.case_id == entry.case_id) {
            return Err(AuditError::DuplicateCaseId(entry.case_id));
        }
        entries.push(entry.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<AuditEntry>, AuditError> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .map_err(|_| AuditError::LockPoisoned)
    }
}
