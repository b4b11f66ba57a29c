//! repo::syncer
//!
//! Reconciles declared repo targets against local on-disk state.
//!
//! # Architecture
//!
//! The syncer is the only component that mutates [`RepoState`]. For each
//! lib it decides between three reconciliation paths:
//!
//! - **Local-path targets** are used in place: no clone, no fetch, no
//!   mutation of the target directory.
//! - **Remote targets without a local copy** are cloned into the managed
//!   cache (`<state_root>/repos/<lib>`).
//! - **Remote targets with a local copy** are fetched and fast-forwarded
//!   to the target branch tip.
//!
//! # Invariants
//!
//! - A repo already at the target branch tip is a no-op; sync is always
//!   safe to repeat
//! - Per-lib failures are isolated: one lib's clone failure never aborts
//!   sibling syncs
//! - Branch changes over local modifications fail with `CheckoutFailed`;
//!   local changes are never discarded
//! - One sync per lib at a time, serialized in-process (task mutex) and
//!   across processes (file lock)

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::lock::SyncLock;
use super::state::{RepoState, SyncStatus};
use crate::core::paths::GantryPaths;
use crate::core::spec::{Protocol, RepoTarget};
use crate::core::types::LibName;
use crate::vcs::{VcsClient, VcsError};

/// Errors from repo reconciliation.
///
/// Each variant names the lib so failures can be reported per-lib without
/// aborting siblings.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// The locator's transport could not be resolved.
    #[error("lib '{lib}': unsupported protocol for locator '{locator}'")]
    UnsupportedProtocol {
        /// The lib with the bad target.
        lib: LibName,
        /// The unresolvable locator.
        locator: String,
    },

    /// Clone failed (network, auth, not-found, or missing local path).
    #[error("lib '{lib}': clone failed: {reason}")]
    CloneFailed {
        /// The lib being cloned.
        lib: LibName,
        /// Why the clone failed.
        reason: String,
    },

    /// Checkout failed (branch missing, fetch failure, or local
    /// modifications conflict).
    #[error("lib '{lib}': checkout failed: {reason}")]
    CheckoutFailed {
        /// The lib being checked out.
        lib: LibName,
        /// Why the checkout failed.
        reason: String,
    },

    /// The per-lib sync lock could not be taken.
    #[error("lib '{lib}': sync lock unavailable: {reason}")]
    LockUnavailable {
        /// The lib whose lock failed.
        lib: LibName,
        /// Why the lock failed.
        reason: String,
    },
}

impl SyncError {
    /// The lib this failure belongs to.
    pub fn lib(&self) -> &LibName {
        match self {
            SyncError::UnsupportedProtocol { lib, .. }
            | SyncError::CloneFailed { lib, .. }
            | SyncError::CheckoutFailed { lib, .. }
            | SyncError::LockUnavailable { lib, .. } => lib,
        }
    }
}

/// The RepoSyncer: exclusive owner of all per-lib repo state.
pub struct RepoSyncer {
    vcs: Arc<dyn VcsClient>,
    paths: GantryPaths,
    /// Per-lib repo state. Short critical sections only.
    states: StdMutex<HashMap<LibName, RepoState>>,
    /// Per-lib in-process serialization of sync operations.
    guards: StdMutex<HashMap<LibName, Arc<tokio::sync::Mutex<()>>>>,
}

impl std::fmt::Debug for RepoSyncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoSyncer")
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

impl RepoSyncer {
    /// Create a syncer over a VCS client and storage layout.
    pub fn new(vcs: Arc<dyn VcsClient>, paths: GantryPaths) -> Self {
        Self {
            vcs,
            paths,
            states: StdMutex::new(HashMap::new()),
            guards: StdMutex::new(HashMap::new()),
        }
    }

    /// Make the lib's local copy match its declared target.
    ///
    /// Returns the updated state on success; the mount source directory
    /// then exists and reflects the target branch tip. On failure the
    /// state records what went wrong and the error names the lib, so
    /// callers can keep syncing siblings.
    pub async fn sync(&self, lib: &LibName, target: &RepoTarget) -> Result<RepoState, SyncError> {
        let protocol = target
            .resolved_protocol()
            .ok_or_else(|| SyncError::UnsupportedProtocol {
                lib: lib.clone(),
                locator: target.locator.clone(),
            })?;

        // Serialize syncs of the same lib within this process.
        let guard = {
            let mut guards = self.guards.lock().expect("guard map poisoned");
            guards.entry(lib.clone()).or_default().clone()
        };
        let _serialized = guard.lock().await;

        if protocol == Protocol::LocalPath {
            return self.sync_local(lib, target).await;
        }
        self.sync_remote(lib, target, protocol).await
    }

    /// Local-path targets are read in place without mutation.
    async fn sync_local(&self, lib: &LibName, target: &RepoTarget) -> Result<RepoState, SyncError> {
        let lib = lib.clone();
        let local_path = PathBuf::from(&target.locator);

        if !local_path.exists() {
            self.update_state(&lib, &local_path, |state| {
                state.status = SyncStatus::Unsynced;
            });
            return Err(SyncError::CloneFailed {
                lib,
                reason: format!("local path '{}' does not exist", local_path.display()),
            });
        }

        let head = if self.vcs.is_repo(&local_path).await {
            self.vcs.head_commit(&local_path).await.ok()
        } else {
            None
        };

        debug!(lib = %lib, path = %local_path.display(), "using local repo in place");
        Ok(self.update_state(&lib, &local_path, |state| {
            state.checked_out.clone_from(&head);
            if head.is_some() {
                state.last_known_good.clone_from(&head);
            }
            state.status = SyncStatus::UpToDate;
        }))
    }

    /// Remote targets live in the managed cache.
    async fn sync_remote(
        &self,
        lib: &LibName,
        target: &RepoTarget,
        protocol: Protocol,
    ) -> Result<RepoState, SyncError> {
        let lib = lib.clone();
        let dest = self.paths.repo_path(&lib);

        // Cross-process serialization for the same working copy.
        let lock_paths = self.paths.clone();
        let lock_lib = lib.clone();
        let _lock = tokio::task::spawn_blocking(move || SyncLock::acquire(&lock_paths, &lock_lib))
            .await
            .map_err(|e| SyncError::LockUnavailable {
                lib: lib.clone(),
                reason: format!("lock task panicked: {e}"),
            })?
            .map_err(|e| SyncError::LockUnavailable {
                lib: lib.clone(),
                reason: e.to_string(),
            })?;

        if !self.vcs.is_repo(&dest).await {
            info!(lib = %lib, locator = %target.locator, %protocol, "cloning");
            self.update_state(&lib, &dest, |state| {
                state.status = SyncStatus::Cloning;
            });

            if let Err(e) = self.vcs.clone_repo(&target.locator, protocol, &dest).await {
                warn!(lib = %lib, error = %e, "clone failed");
                self.update_state(&lib, &dest, |state| {
                    state.status = SyncStatus::Unsynced;
                });
                return Err(SyncError::CloneFailed {
                    lib,
                    reason: e.to_string(),
                });
            }
        }

        match self.vcs.fetch_and_checkout(&dest, &target.branch).await {
            Ok(commit) => {
                debug!(lib = %lib, branch = %target.branch, %commit, "up to date");
                Ok(self.update_state(&lib, &dest, |state| {
                    state.checked_out = Some(commit.clone());
                    state.last_known_good = Some(commit.clone());
                    state.status = SyncStatus::UpToDate;
                }))
            }
            Err(e) => {
                let status = match &e {
                    VcsError::FetchFailed { .. } => SyncStatus::Stale,
                    _ => SyncStatus::Conflict,
                };
                warn!(lib = %lib, error = %e, ?status, "checkout failed");
                self.update_state(&lib, &dest, |state| {
                    state.status = status;
                });
                Err(SyncError::CheckoutFailed {
                    lib,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Apply a mutation to a lib's state, creating the entry on first
    /// reference, and return the result.
    fn update_state(
        &self,
        lib: &LibName,
        local_path: &std::path::Path,
        mutate: impl FnOnce(&mut RepoState),
    ) -> RepoState {
        let mut states = self.states.lock().expect("state map poisoned");
        let state = states
            .entry(lib.clone())
            .or_insert_with(|| RepoState::unsynced(lib.clone(), local_path.to_path_buf()));
        state.local_path = local_path.to_path_buf();
        mutate(state);
        state.clone()
    }

    /// Read-only view of one lib's state.
    pub fn state_of(&self, lib: &LibName) -> Option<RepoState> {
        self.states
            .lock()
            .expect("state map poisoned")
            .get(lib)
            .cloned()
    }

    /// Read-only view of all tracked states, sorted by lib name.
    pub fn states(&self) -> Vec<RepoState> {
        let mut all: Vec<RepoState> = self
            .states
            .lock()
            .expect("state map poisoned")
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| a.lib.cmp(&b.lib));
        all
    }

    /// Drop state for libs no longer present in any active spec.
    pub fn retain_active(&self, active: &[LibName]) {
        self.states
            .lock()
            .expect("state map poisoned")
            .retain(|lib, _| active.contains(lib));
    }
}
