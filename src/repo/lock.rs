//! repo::lock
//!
//! Per-lib advisory sync lock.
//!
//! # Architecture
//!
//! Only one sync operation per lib may run at a time; racing checkouts in
//! the same working copy corrupt it. The lock is lib-scoped, not
//! host-global: syncs for distinct libs proceed in parallel.
//!
//! # Storage
//!
//! - `<state_root>/locks/<lib>.lock` - Lock file with OS-level exclusive
//!   lock
//!
//! # Invariants
//!
//! - Lock must be held for the entire clone/fetch/checkout sequence
//! - Lock is automatically released on drop (RAII pattern)
//! - Acquisition blocks until the holder releases; `try_acquire` fails
//!   fast instead

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::GantryPaths;
use crate::core::types::LibName;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock (try_acquire only).
    #[error("lib '{0}' is being synced by another gantry process")]
    AlreadyLocked(LibName),

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// I/O error during lock operations.
    #[error("lock i/o error: {0}")]
    IoError(#[from] std::io::Error),
}

/// An exclusive per-lib sync lock.
///
/// Released when the guard is dropped, so the lock is always released
/// even if a sync panics.
#[derive(Debug)]
pub struct SyncLock {
    /// Path to the lock file.
    path: PathBuf,
    /// The open file handle with the lock held.
    file: Option<File>,
}

impl SyncLock {
    /// Acquire the sync lock for a lib, blocking until it is free.
    ///
    /// Blocking is correct here: a concurrent provisioning request for
    /// the same lib should wait for the in-flight sync rather than fail,
    /// and the subsequent sync is an idempotent no-op.
    ///
    /// # Errors
    ///
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be acquired
    pub fn acquire(paths: &GantryPaths, lib: &LibName) -> Result<Self, LockError> {
        let file = Self::open_lock_file(paths, lib)?;
        file.lock_exclusive()
            .map_err(|e| LockError::AcquireFailed(e.to_string()))?;
        Ok(Self {
            path: paths.lock_path(lib),
            file: Some(file),
        })
    }

    /// Try to acquire the lock without blocking.
    ///
    /// # Errors
    ///
    /// [`LockError::AlreadyLocked`] if another process holds it.
    pub fn try_acquire(paths: &GantryPaths, lib: &LibName) -> Result<Self, LockError> {
        let file = Self::open_lock_file(paths, lib)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path: paths.lock_path(lib),
                file: Some(file),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Err(LockError::AlreadyLocked(lib.clone()))
            }
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    fn open_lock_file(paths: &GantryPaths, lib: &LibName) -> Result<File, LockError> {
        let locks_dir = paths.locks_dir();
        fs::create_dir_all(&locks_dir).map_err(|e| {
            LockError::CreateFailed(format!("cannot create {}: {}", locks_dir.display(), e))
        })?;

        let path = paths.lock_path(lib);
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e)))
    }

    /// Check if the lock is currently held by this guard.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock explicitly.
    ///
    /// Called automatically on drop; available for early release.
    pub fn release(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
    }
}

impl Drop for SyncLock {
    fn drop(&mut self) {
        self.release();
    }
}
