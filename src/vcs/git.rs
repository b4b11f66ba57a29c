//! vcs::git
//!
//! git2-backed VcsClient implementation.
//!
//! # Design
//!
//! libgit2 calls are blocking, so every trait method runs its git2 work on
//! the tokio blocking pool. Credentials come from the ssh-agent for SSH
//! locators and the default credential helpers for HTTPS; Gantry itself
//! never prompts.
//!
//! Checkouts are **safe**, never forced: a working copy with local
//! modifications that the target tree would overwrite surfaces as
//! [`VcsError::DirtyWorktree`], and the repo is left exactly as found.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::traits::{VcsClient, VcsError};
use crate::core::spec::Protocol;

/// Remote name the syncer tracks.
const ORIGIN: &str = "origin";

/// git2-backed client.
///
/// Stateless; one instance serves all libs.
#[derive(Debug, Default, Clone)]
pub struct Git2Client;

impl Git2Client {
    /// Create a new client.
    pub fn new() -> Self {
        Self
    }

    fn callbacks<'a>() -> git2::RemoteCallbacks<'a> {
        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.credentials(|_url, username_from_url, allowed| {
            if allowed.contains(git2::CredentialType::SSH_KEY) {
                return git2::Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"));
            }
            if allowed.contains(git2::CredentialType::DEFAULT) {
                return git2::Cred::default();
            }
            git2::Cred::default()
        });
        callbacks
    }

    fn fetch_options<'a>() -> git2::FetchOptions<'a> {
        let mut options = git2::FetchOptions::new();
        options.remote_callbacks(Self::callbacks());
        options
    }

    fn open(workdir: &Path) -> Result<git2::Repository, VcsError> {
        git2::Repository::open(workdir).map_err(|_| VcsError::NotARepo {
            path: workdir.to_path_buf(),
        })
    }

    /// Whether any tracked file differs from HEAD.
    ///
    /// Untracked files do not count: a checkout never overwrites them
    /// unless they collide, and collisions surface from the checkout
    /// itself.
    fn worktree_is_dirty(repo: &git2::Repository) -> Result<bool, git2::Error> {
        let mut options = git2::StatusOptions::new();
        options
            .include_untracked(false)
            .include_ignored(false)
            .include_unmodified(false);
        let statuses = repo.statuses(Some(&mut options))?;
        Ok(!statuses.is_empty())
    }

    fn blocking_clone(locator: String, dest: PathBuf) -> Result<(), VcsError> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| VcsError::Internal {
                message: format!("failed to create '{}': {e}", parent.display()),
            })?;
        }

        let mut builder = git2::build::RepoBuilder::new();
        builder.fetch_options(Self::fetch_options());
        builder
            .clone(&locator, &dest)
            .map(|_| ())
            .map_err(|e| VcsError::CloneFailed {
                locator,
                reason: e.message().to_string(),
            })
    }

    fn blocking_fetch_and_checkout(workdir: PathBuf, branch: String) -> Result<String, VcsError> {
        let repo = Self::open(&workdir)?;

        let mut remote = repo
            .find_remote(ORIGIN)
            .map_err(|e| VcsError::Internal {
                message: format!("no '{ORIGIN}' remote: {}", e.message()),
            })?;
        remote
            .fetch(&[branch.as_str()], Some(&mut Self::fetch_options()), None)
            .map_err(|e| VcsError::FetchFailed {
                reason: e.message().to_string(),
            })?;

        let remote_ref = format!("refs/remotes/{ORIGIN}/{branch}");
        let target = repo
            .find_reference(&remote_ref)
            .map_err(|_| VcsError::BranchNotFound {
                branch: branch.clone(),
            })?
            .peel_to_commit()
            .map_err(|e| VcsError::Internal {
                message: e.message().to_string(),
            })?;

        // Already at the branch tip: idempotent no-op.
        if let Ok(head) = repo.head() {
            if head.shorthand() == Some(branch.as_str())
                && head.target() == Some(target.id())
            {
                return Ok(target.id().to_string());
            }
        }

        if Self::worktree_is_dirty(&repo).map_err(|e| VcsError::Internal {
            message: e.message().to_string(),
        })? {
            return Err(VcsError::DirtyWorktree {
                details: format!(
                    "local modifications in '{}' block checkout of '{branch}'",
                    workdir.display()
                ),
            });
        }

        // Safe checkout first (it refuses to clobber), then move the
        // branch ref and HEAD. Updating the ref directly also covers the
        // currently checked-out branch, which `git_branch_create` cannot
        // force-update.
        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.safe();
        repo.checkout_tree(target.as_object(), Some(&mut checkout))
            .map_err(|e| VcsError::DirtyWorktree {
                details: e.message().to_string(),
            })?;

        let refname = format!("refs/heads/{branch}");
        repo.reference(&refname, target.id(), true, "sync to branch tip")
            .map_err(|e| VcsError::Internal {
                message: e.message().to_string(),
            })?;
        repo.set_head(&refname).map_err(|e| VcsError::Internal {
            message: e.message().to_string(),
        })?;

        Ok(target.id().to_string())
    }

    fn blocking_head_commit(workdir: PathBuf) -> Result<String, VcsError> {
        let repo = Self::open(&workdir)?;
        let head = repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map_err(|e| VcsError::Internal {
                message: e.message().to_string(),
            })?;
        Ok(head.id().to_string())
    }
}

#[async_trait]
impl VcsClient for Git2Client {
    async fn clone_repo(
        &self,
        locator: &str,
        _protocol: Protocol,
        dest: &Path,
    ) -> Result<(), VcsError> {
        let locator = locator.to_string();
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || Self::blocking_clone(locator, dest))
            .await
            .map_err(|e| VcsError::Internal {
                message: format!("clone task panicked: {e}"),
            })?
    }

    async fn fetch_and_checkout(&self, workdir: &Path, branch: &str) -> Result<String, VcsError> {
        let workdir = workdir.to_path_buf();
        let branch = branch.to_string();
        tokio::task::spawn_blocking(move || Self::blocking_fetch_and_checkout(workdir, branch))
            .await
            .map_err(|e| VcsError::Internal {
                message: format!("checkout task panicked: {e}"),
            })?
    }

    async fn head_commit(&self, workdir: &Path) -> Result<String, VcsError> {
        let workdir = workdir.to_path_buf();
        tokio::task::spawn_blocking(move || Self::blocking_head_commit(workdir))
            .await
            .map_err(|e| VcsError::Internal {
                message: format!("head task panicked: {e}"),
            })?
    }

    async fn is_repo(&self, path: &Path) -> bool {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || git2::Repository::open(&path).is_ok())
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_repo(dir: &Path) -> git2::Repository {
        let repo = git2::Repository::init(dir).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "test").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();
        }
        repo
    }

    fn commit_file(repo: &git2::Repository, name: &str, contents: &str) -> git2::Oid {
        let workdir = repo.workdir().unwrap();
        std::fs::write(workdir.join(name), contents).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = repo.signature().unwrap();
        let parents: Vec<git2::Commit> = repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok())
            .into_iter()
            .collect();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, "commit", &tree, &parent_refs)
            .unwrap()
    }

    #[tokio::test]
    async fn is_repo_detects_repositories() {
        let tmp = tempfile::tempdir().unwrap();
        let client = Git2Client::new();
        assert!(!client.is_repo(tmp.path()).await);

        init_repo(tmp.path());
        assert!(client.is_repo(tmp.path()).await);
    }

    #[tokio::test]
    async fn head_commit_reads_checked_out_commit() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = init_repo(tmp.path());
        let oid = commit_file(&repo, "a.txt", "hello");

        let client = Git2Client::new();
        let head = client.head_commit(tmp.path()).await.unwrap();
        assert_eq!(head, oid.to_string());
    }

    #[tokio::test]
    async fn head_commit_on_non_repo_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let client = Git2Client::new();
        let err = client.head_commit(tmp.path()).await.unwrap_err();
        assert!(matches!(err, VcsError::NotARepo { .. }));
    }

    /// Make sure a branch named `master` exists at HEAD, whatever the
    /// host's init.defaultBranch says.
    fn ensure_master(repo: &git2::Repository) -> git2::Oid {
        let head = repo.head().unwrap().peel_to_commit().unwrap().id();
        if repo.find_branch("master", git2::BranchType::Local).is_err() {
            repo.branch("master", &repo.find_commit(head).unwrap(), false)
                .unwrap();
        }
        head
    }

    #[tokio::test]
    async fn clone_from_local_origin_and_checkout() {
        let upstream = tempfile::tempdir().unwrap();
        let repo = init_repo(upstream.path());
        commit_file(&repo, "lib.txt", "v1");
        let head = ensure_master(&repo);

        let dest_root = tempfile::tempdir().unwrap();
        let dest = dest_root.path().join("clone");
        let client = Git2Client::new();
        client
            .clone_repo(
                upstream.path().to_str().unwrap(),
                Protocol::LocalPath,
                &dest,
            )
            .await
            .unwrap();

        let synced = client.fetch_and_checkout(&dest, "master").await.unwrap();
        assert_eq!(synced, head.to_string());

        // Re-running is a no-op at the same tip.
        let again = client.fetch_and_checkout(&dest, "master").await.unwrap();
        assert_eq!(again, synced);
    }

    #[tokio::test]
    async fn missing_branch_is_reported() {
        let upstream = tempfile::tempdir().unwrap();
        let repo = init_repo(upstream.path());
        commit_file(&repo, "lib.txt", "v1");

        let dest_root = tempfile::tempdir().unwrap();
        let dest = dest_root.path().join("clone");
        let client = Git2Client::new();
        client
            .clone_repo(
                upstream.path().to_str().unwrap(),
                Protocol::LocalPath,
                &dest,
            )
            .await
            .unwrap();

        let err = client
            .fetch_and_checkout(&dest, "no-such-branch")
            .await
            .unwrap_err();
        assert!(matches!(err, VcsError::BranchNotFound { .. }));
    }

    #[tokio::test]
    async fn dirty_worktree_blocks_branch_switch() {
        let upstream = tempfile::tempdir().unwrap();
        let repo = init_repo(upstream.path());
        commit_file(&repo, "lib.txt", "v1");
        let head = ensure_master(&repo);
        repo.branch("feature", &repo.find_commit(head).unwrap(), true)
            .unwrap();

        let dest_root = tempfile::tempdir().unwrap();
        let dest = dest_root.path().join("clone");
        let client = Git2Client::new();
        client
            .clone_repo(
                upstream.path().to_str().unwrap(),
                Protocol::LocalPath,
                &dest,
            )
            .await
            .unwrap();
        client.fetch_and_checkout(&dest, "master").await.unwrap();

        // Advance the remote feature branch so the local switch is a real move.
        commit_file(&repo, "lib.txt", "v2");
        let new_head = repo.head().unwrap().peel_to_commit().unwrap().id();
        repo.branch("feature", &repo.find_commit(new_head).unwrap(), true)
            .unwrap();

        // Local modification in the clone.
        std::fs::write(dest.join("lib.txt"), "scribbled").unwrap();

        let err = client.fetch_and_checkout(&dest, "feature").await.unwrap_err();
        assert!(matches!(err, VcsError::DirtyWorktree { .. }));

        // Local change is still there.
        assert_eq!(std::fs::read_to_string(dest.join("lib.txt")).unwrap(), "scribbled");
    }
}
