//! repo::state
//!
//! Runtime repo state, one entry per lib per host.
//!
//! # Lifecycle
//!
//! A `RepoState` is created on first reference to a lib and destroyed
//! when the lib is removed from all active specs
//! ([`crate::repo::syncer::RepoSyncer::retain_active`]). It is mutated
//! only by the syncer; everything else sees read-only clones.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::types::LibName;

/// Where a lib's local copy stands relative to its declared target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    /// No local copy yet.
    Unsynced,
    /// Clone in progress.
    Cloning,
    /// Local copy matches the target branch tip.
    UpToDate,
    /// Local copy exists but could not be refreshed (fetch failure).
    Stale,
    /// Local copy conflicts with the target (dirty worktree, missing
    /// branch).
    Conflict,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncStatus::Unsynced => "unsynced",
            SyncStatus::Cloning => "cloning",
            SyncStatus::UpToDate => "up-to-date",
            SyncStatus::Stale => "stale",
            SyncStatus::Conflict => "conflict",
        };
        write!(f, "{s}")
    }
}

/// Runtime state of one lib's local repo copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoState {
    /// The lib this state belongs to.
    pub lib: LibName,

    /// Local path holding the copy (managed checkout or in-place local
    /// target).
    pub local_path: PathBuf,

    /// Currently checked-out commit, when known.
    pub checked_out: Option<String>,

    /// Last commit a sync completed successfully at.
    pub last_known_good: Option<String>,

    /// Current sync status.
    pub status: SyncStatus,
}

impl RepoState {
    /// Initial state for a lib that has never been synced.
    pub fn unsynced(lib: LibName, local_path: PathBuf) -> Self {
        Self {
            lib,
            local_path,
            checked_out: None,
            last_known_good: None,
            status: SyncStatus::Unsynced,
        }
    }

    /// Whether the mount source is usable as-is.
    pub fn is_ready(&self) -> bool {
        self.status == SyncStatus::UpToDate
    }
}
