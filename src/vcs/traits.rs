//! vcs::traits
//!
//! VcsClient trait definition for repo clone and checkout operations.
//!
//! # Design
//!
//! The `VcsClient` trait is async because clone and fetch involve network
//! I/O. All methods return `Result` with typed failure reasons so the
//! syncer can map them onto its own error taxonomy without string
//! matching.
//!
//! Failures never mutate the working copy destructively: a checkout that
//! would overwrite local modifications is reported as
//! [`VcsError::DirtyWorktree`], and the operator resolves the working
//! copy by hand.
//!
//! # Example
//!
//! ```ignore
//! use gantry::vcs::{VcsClient, VcsError};
//! use gantry::core::spec::Protocol;
//! use std::path::Path;
//!
//! async fn mirror(vcs: &dyn VcsClient) -> Result<(), VcsError> {
//!     let dest = Path::new("/var/lib/gantry/repos/auth");
//!     vcs.clone_repo("git@example.com:org/auth.git", Protocol::Ssh, dest).await?;
//!     let head = vcs.fetch_and_checkout(dest, "master").await?;
//!     println!("auth is at {head}");
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::core::spec::Protocol;

/// Errors from version-control operations.
///
/// These categories cover the failure modes the syncer needs to handle
/// distinctly; anything else lands in `Internal`.
#[derive(Debug, Clone, Error)]
pub enum VcsError {
    /// Clone failed (network, auth, or repo not found).
    #[error("clone of '{locator}' failed: {reason}")]
    CloneFailed {
        /// The locator that was being cloned.
        locator: String,
        /// Why the clone failed.
        reason: String,
    },

    /// Fetching remote refs failed.
    #[error("fetch failed: {reason}")]
    FetchFailed {
        /// Why the fetch failed.
        reason: String,
    },

    /// The requested branch does not exist on the remote.
    #[error("branch not found: {branch}")]
    BranchNotFound {
        /// The missing branch.
        branch: String,
    },

    /// The working copy has local modifications the checkout would clobber.
    #[error("working copy has local modifications: {details}")]
    DirtyWorktree {
        /// Description of what is dirty.
        details: String,
    },

    /// The path exists but is not a repository.
    #[error("not a repository: {path}")]
    NotARepo {
        /// The path that was inspected.
        path: PathBuf,
    },

    /// Internal client error.
    #[error("vcs error: {message}")]
    Internal {
        /// The error message.
        message: String,
    },
}

/// Version-control collaborator.
///
/// Implementations must be safe to call concurrently for distinct
/// destinations; callers serialize operations on the same destination
/// (the syncer holds a per-lib lock).
#[async_trait]
pub trait VcsClient: Send + Sync {
    /// Clone `locator` into `dest` over the given transport.
    ///
    /// `dest`'s parent is created if needed. Never called for
    /// [`Protocol::LocalPath`] targets, which are used in place.
    async fn clone_repo(
        &self,
        locator: &str,
        protocol: Protocol,
        dest: &Path,
    ) -> Result<(), VcsError>;

    /// Fetch remote refs and check out the tip of `branch`.
    ///
    /// Returns the commit id the branch now points at. A working copy
    /// already at the branch tip is a no-op. Local modifications that the
    /// checkout would overwrite fail with [`VcsError::DirtyWorktree`]
    /// rather than being discarded.
    async fn fetch_and_checkout(&self, workdir: &Path, branch: &str) -> Result<String, VcsError>;

    /// The commit id the working copy currently has checked out.
    async fn head_commit(&self, workdir: &Path) -> Result<String, VcsError>;

    /// Whether `path` holds a repository this client can operate on.
    async fn is_repo(&self, path: &Path) -> bool;
}
