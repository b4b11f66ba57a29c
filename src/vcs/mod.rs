//! vcs
//!
//! Version-control collaborator boundary.
//!
//! # Architecture
//!
//! The `VcsClient` trait is the **single doorway** to version control in
//! Gantry. No other module imports `git2` directly. This keeps error
//! handling consistent, lets the syncer stay transport-agnostic, and lets
//! tests swap in a deterministic double.
//!
//! # Modules
//!
//! - [`traits`] - The `VcsClient` trait and typed errors
//! - [`git`] - git2-backed implementation
//! - [`mock`] - In-memory implementation for tests

pub mod git;
pub mod mock;
pub mod traits;

pub use git::Git2Client;
pub use mock::MockVcs;
pub use traits::{VcsClient, VcsError};
