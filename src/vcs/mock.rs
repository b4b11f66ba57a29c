//! vcs::mock
//!
//! Mock VcsClient implementation for deterministic testing.
//!
//! # Design
//!
//! The mock keeps remote and working-copy state in memory and allows
//! configuring failure scenarios per locator or working copy. It performs
//! no filesystem access.
//!
//! # Example
//!
//! ```
//! use gantry::vcs::{MockVcs, VcsClient};
//! use gantry::core::spec::Protocol;
//! use std::path::Path;
//!
//! # tokio_test::block_on(async {
//! let vcs = MockVcs::new();
//! vcs.set_remote_branch("git@example.com:org/auth.git", "master", "aaa111");
//!
//! let dest = Path::new("/cache/auth");
//! vcs.clone_repo("git@example.com:org/auth.git", Protocol::Ssh, dest)
//!     .await
//!     .unwrap();
//! let head = vcs.fetch_and_checkout(dest, "master").await.unwrap();
//! assert_eq!(head, "aaa111");
//! # });
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{VcsClient, VcsError};
use crate::core::spec::Protocol;

/// A working copy the mock knows about.
#[derive(Debug, Clone)]
struct MockWorkingCopy {
    /// Locator it was cloned from.
    locator: String,
    /// Currently checked-out commit.
    head: Option<String>,
    /// Whether local modifications block branch switches.
    dirty: bool,
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    /// A clone of (locator, dest).
    Clone(String, PathBuf),
    /// A fetch-and-checkout of (workdir, branch).
    FetchAndCheckout(PathBuf, String),
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct MockVcsInner {
    /// Remote branch tips keyed by (locator, branch).
    remote_branches: HashMap<(String, String), String>,
    /// Working copies keyed by path.
    working_copies: HashMap<PathBuf, MockWorkingCopy>,
    /// Locators whose clone fails with the given reason.
    fail_clone: HashMap<String, String>,
    /// Working copies whose fetch fails with the given reason.
    fail_fetch: HashMap<PathBuf, String>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Mock VCS for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share
/// state.
#[derive(Debug, Clone, Default)]
pub struct MockVcs {
    inner: Arc<Mutex<MockVcsInner>>,
}

impl MockVcs {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure a remote branch tip.
    pub fn set_remote_branch(&self, locator: &str, branch: &str, commit: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .remote_branches
            .insert((locator.to_string(), branch.to_string()), commit.to_string());
    }

    /// Register an existing working copy (for local-path targets or
    /// pre-seeded clones).
    pub fn register_working_copy(&self, path: &Path, locator: &str, head: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.working_copies.insert(
            path.to_path_buf(),
            MockWorkingCopy {
                locator: locator.to_string(),
                head: Some(head.to_string()),
                dirty: false,
            },
        );
    }

    /// Make clones of `locator` fail.
    pub fn fail_clone_with(&self, locator: &str, reason: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .fail_clone
            .insert(locator.to_string(), reason.to_string());
    }

    /// Make fetches in `workdir` fail.
    pub fn fail_fetch_with(&self, workdir: &Path, reason: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .fail_fetch
            .insert(workdir.to_path_buf(), reason.to_string());
    }

    /// Mark a working copy as locally modified.
    pub fn mark_dirty(&self, workdir: &Path) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(copy) = inner.working_copies.get_mut(workdir) {
            copy.dirty = true;
        }
    }

    /// All operations performed, in order.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.inner.lock().unwrap().operations.clone()
    }

    /// Number of clones performed for a locator.
    pub fn clone_count(&self, locator: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .operations
            .iter()
            .filter(|op| matches!(op, MockOperation::Clone(l, _) if l == locator))
            .count()
    }
}

#[async_trait]
impl VcsClient for MockVcs {
    async fn clone_repo(
        &self,
        locator: &str,
        _protocol: Protocol,
        dest: &Path,
    ) -> Result<(), VcsError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .operations
            .push(MockOperation::Clone(locator.to_string(), dest.to_path_buf()));

        if let Some(reason) = inner.fail_clone.get(locator) {
            return Err(VcsError::CloneFailed {
                locator: locator.to_string(),
                reason: reason.clone(),
            });
        }

        inner.working_copies.insert(
            dest.to_path_buf(),
            MockWorkingCopy {
                locator: locator.to_string(),
                head: None,
                dirty: false,
            },
        );
        Ok(())
    }

    async fn fetch_and_checkout(&self, workdir: &Path, branch: &str) -> Result<String, VcsError> {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(MockOperation::FetchAndCheckout(
            workdir.to_path_buf(),
            branch.to_string(),
        ));

        if let Some(reason) = inner.fail_fetch.get(workdir) {
            return Err(VcsError::FetchFailed {
                reason: reason.clone(),
            });
        }

        let copy = inner
            .working_copies
            .get(workdir)
            .cloned()
            .ok_or_else(|| VcsError::NotARepo {
                path: workdir.to_path_buf(),
            })?;

        let tip = inner
            .remote_branches
            .get(&(copy.locator.clone(), branch.to_string()))
            .cloned()
            .ok_or_else(|| VcsError::BranchNotFound {
                branch: branch.to_string(),
            })?;

        // At the tip already: no-op regardless of dirtiness.
        if copy.head.as_deref() == Some(tip.as_str()) {
            return Ok(tip);
        }

        if copy.dirty {
            return Err(VcsError::DirtyWorktree {
                details: format!("local modifications in '{}'", workdir.display()),
            });
        }

        if let Some(copy) = inner.working_copies.get_mut(workdir) {
            copy.head = Some(tip.clone());
        }
        Ok(tip)
    }

    async fn head_commit(&self, workdir: &Path) -> Result<String, VcsError> {
        let inner = self.inner.lock().unwrap();
        let copy = inner
            .working_copies
            .get(workdir)
            .ok_or_else(|| VcsError::NotARepo {
                path: workdir.to_path_buf(),
            })?;
        copy.head.clone().ok_or_else(|| VcsError::Internal {
            message: "working copy has no checked-out commit".to_string(),
        })
    }

    async fn is_repo(&self, path: &Path) -> bool {
        self.inner.lock().unwrap().working_copies.contains_key(path)
    }
}
