//! Audit trail kept as one JSON document: an ordered array of entries.
//!
//! Every append is a read-modify-write of the whole document. All writes
//! go through one mutex, so concurrent appends inside this process can no
//! longer overwrite each other. The new document is written to a temporary
//! file in the same directory and renamed over the old one, so readers see
//! either the previous or the next complete document.
//!
//! A missing or blank file is an empty trail. A corrupt or unreadable file
//! lists as empty (with a warning). A corrupt file is never overwritten: the
//! next append moves it aside to `<name>.corrupt-<unix-ts>` first. Read
//! errors other than corruption stay fatal for `append`.
//!
//! Production gap: the lock is per process. Several processes sharing one
//! file are not serialized.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{AuditError, AuditStore};
use crate::models::AuditEntry;

/// What was found on disk.
enum Loaded {
    Entries(Vec<AuditEntry>),
    Corrupt(String),
}

pub struct JsonFileAuditStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileAuditStore {
    /// Store at `path`. Nothing is touched on disk until the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store at `path`, creating the parent directory if needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AuditError> {
        let store = Self::new(path);
        if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Loaded, AuditError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Loaded::Entries(Vec::new()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Ok(Loaded::Corrupt(e.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        if text.trim().is_empty() {
            return Ok(Loaded::Entries(Vec::new()));
        }

        match serde_json::from_str::<Vec<AuditEntry>>(&text) {
            Ok(entries) => Ok(Loaded::Entries(entries)),
            Err(e) => Ok(Loaded::Corrupt(e.to_string())),
        }
    }

    /// Move a corrupt document out of the way so it is kept for inspection.
    fn quarantine(&self, reason: &str) -> Result<PathBuf, AuditError> {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audit_log.json".to_string());
        let target = self.path.with_file_name(format!(
            "{file_name}.corrupt-{}",
            chrono::Utc::now().timestamp()
        ));
        fs::rename(&self.path, &target)?;
        tracing::warn!(
            path = %self.path.display(),
            moved_to = %target.display(),
            reason,
            "Corrupt audit log moved aside"
        );
        Ok(target)
    }

    fn write_atomic(&self, entries: &[AuditEntry]) -> Result<(), AuditError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let tmp = tempfile::NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, entries)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| AuditError::Io(e.error))?;
        Ok(())
    }
}

impl AuditStore for JsonFileAuditStore {
    fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let _guard = self.write_lock.lock().map_err(|_| AuditError::LockPoisoned)?;

        let mut entries = match self.load()? {
            Loaded::Entries(entries) => entries,
            Loaded::Corrupt(reason) => {
                self.quarantine(&reason)?;
                Vec::new()
            }
        };

        if entries.iter().any(|e| e.case_id == entry.case_id) {
            return Err(AuditError::DuplicateCaseId(entry.case_id));
        }

        entries.push(entry.clone());
        self.write_atomic(&entries)?;

        tracing::debug!(case_id = %entry.case_id, total = entries.len(), "Audit entry appended");
        Ok(())
    }

    fn list(&self) -> Result<Vec<AuditEntry>, AuditError> {
        match self.load() {
            Ok(Loaded::Entries(entries)) => Ok(entries),
            Ok(Loaded::Corrupt(reason)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    reason,
                    "Audit log corrupt, treating as empty"
                );
                Ok(Vec::new())
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    kind = e.kind(),
                    "Audit log unreadable, treating as empty"
                );
                Ok(Vec::new())
            }
        }
    }
}
