//! engine::record
//!
//! Per-container install execution records.
//!
//! # Architecture
//!
//! The record is what makes re-entry idempotent: it maps each lib (and
//! the app's own `once` commands) to the fingerprint of the command set
//! that last completed successfully. On the next lifecycle event a
//! matching fingerprint skips the install; a changed command list
//! invalidates exactly that lib.
//!
//! # Lifecycle
//!
//! Created at container creation, updated after each successful install
//! batch, destroyed with the container
//! ([`RecordStore::delete`]). Owned exclusively by the execution engine
//! for one container; no cross-container locking is needed.
//!
//! # Storage
//!
//! One JSON file per container at `<state_root>/records/<container>.json`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::paths::GantryPaths;
use crate::core::types::{ContainerId, Fingerprint, LibName, UtcTimestamp};

/// Errors from record persistence.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Failed to read a record file.
    #[error("failed to read record for '{container}': {reason}")]
    ReadError {
        /// The container whose record failed to load.
        container: ContainerId,
        /// Why the read failed.
        reason: String,
    },

    /// Failed to write a record file.
    #[error("failed to write record for '{container}': {reason}")]
    WriteError {
        /// The container whose record failed to persist.
        container: ContainerId,
        /// Why the write failed.
        reason: String,
    },
}

/// One completed install batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallEntry {
    /// Fingerprint of the command set that completed.
    pub fingerprint: Fingerprint,
    /// When the batch last completed successfully.
    pub completed_at: UtcTimestamp,
}

impl InstallEntry {
    /// Create an entry completed now.
    pub fn completed(fingerprint: Fingerprint) -> Self {
        Self {
            fingerprint,
            completed_at: UtcTimestamp::now(),
        }
    }
}

/// The install execution record for one container instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallExecutionRecord {
    /// Per-lib entries.
    #[serde(default)]
    pub libs: HashMap<LibName, InstallEntry>,
    /// The app's own `once` entry, present after the first successful
    /// run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_once: Option<InstallEntry>,
}

impl InstallExecutionRecord {
    /// Create an empty record (fresh container).
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a lib's planned install matches its recorded fingerprint.
    pub fn lib_is_current(&self, lib: &LibName, fingerprint: &Fingerprint) -> bool {
        self.libs
            .get(lib)
            .is_some_and(|entry| &entry.fingerprint == fingerprint)
    }

    /// Record a lib's successful install batch.
    pub fn mark_lib_completed(&mut self, lib: LibName, fingerprint: Fingerprint) {
        self.libs.insert(lib, InstallEntry::completed(fingerprint));
    }

    /// Whether the app's `once` commands have already run with this
    /// fingerprint.
    pub fn app_once_is_current(&self, fingerprint: &Fingerprint) -> bool {
        self.app_once
            .as_ref()
            .is_some_and(|entry| &entry.fingerprint == fingerprint)
    }

    /// Record the app's successful `once` run.
    pub fn mark_app_once_completed(&mut self, fingerprint: Fingerprint) {
        self.app_once = Some(InstallEntry::completed(fingerprint));
    }
}

/// Loads and persists per-container records.
#[derive(Debug, Clone)]
pub struct RecordStore {
    paths: GantryPaths,
}

impl RecordStore {
    /// Create a store over the storage layout.
    pub fn new(paths: GantryPaths) -> Self {
        Self { paths }
    }

    /// Load a container's record; a missing file is an empty record.
    pub fn load(&self, container: &ContainerId) -> Result<InstallExecutionRecord, RecordError> {
        let path = self.paths.record_path(container);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(InstallExecutionRecord::new())
            }
            Err(e) => {
                return Err(RecordError::ReadError {
                    container: container.clone(),
                    reason: e.to_string(),
                })
            }
        };

        serde_json::from_str(&contents).map_err(|e| RecordError::ReadError {
            container: container.clone(),
            reason: format!("corrupt record: {e}"),
        })
    }

    /// Persist a container's record (atomic replace).
    pub fn save(
        &self,
        container: &ContainerId,
        record: &InstallExecutionRecord,
    ) -> Result<(), RecordError> {
        let dir = self.paths.records_dir();
        std::fs::create_dir_all(&dir).map_err(|e| RecordError::WriteError {
            container: container.clone(),
            reason: e.to_string(),
        })?;

        let json =
            serde_json::to_string_pretty(record).map_err(|e| RecordError::WriteError {
                container: container.clone(),
                reason: e.to_string(),
            })?;

        let path = self.paths.record_path(container);
        let tmp = dir.join(format!("{container}.json.tmp"));
        std::fs::write(&tmp, json).map_err(|e| RecordError::WriteError {
            container: container.clone(),
            reason: e.to_string(),
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| RecordError::WriteError {
            container: container.clone(),
            reason: e.to_string(),
        })
    }

    /// Destroy a container's record. Missing records are a no-op.
    pub fn delete(&self, container: &ContainerId) -> Result<(), RecordError> {
        let path = self.paths.record_path(container);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RecordError::WriteError {
                container: container.clone(),
                reason: e.to_string(),
            }),
        }
    }
}
