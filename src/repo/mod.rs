//! repo
//!
//! Repo reconciliation: making local on-disk state match declared repo
//! targets.
//!
//! # Modules
//!
//! - [`state`] - RepoState and sync status tracking
//! - [`lock`] - Per-lib advisory sync locks
//! - [`syncer`] - The RepoSyncer itself
//!
//! # Ownership
//!
//! `RepoState` is exclusively owned by the [`syncer::RepoSyncer`] and
//! exposed read-only. Only one sync operation per lib runs at a time;
//! concurrent provisioning requests for the same lib serialize on the
//! lib's lock.

pub mod lock;
pub mod state;
pub mod syncer;

pub use lock::{LockError, SyncLock};
pub use state::{RepoState, SyncStatus};
pub use syncer::{RepoSyncer, SyncError};
