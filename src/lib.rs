//! Gantry - dependency-ordered provisioning for containerized dev
//! environments
//!
//! Gantry resolves the transitive dependency graph of "libs" (externally
//! versioned source repos) an app requires, reconciles each lib's local
//! repo state against its declared target, mounts repo contents and
//! registered assets into a running container, and runs each lib's
//! install commands in dependency order exactly once per relevant
//! container lifecycle event, before the app's own startup commands.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to
//!   the engine)
//! - [`engine`] - Orchestrates Resolve -> Plan -> Execute; owns the
//!   per-container state machine and install records
//! - [`core`] - Domain types, spec records, graph resolution, config,
//!   and paths
//! - [`repo`] - Repo reconciliation (sync state, per-lib locks, the
//!   syncer)
//! - [`assets`] - Asset registration lookup and resolution
//! - [`vcs`] - Single interface for all version-control operations
//! - [`runtime`] - Container-runtime collaborator boundary
//! - [`ui`] - Operator-facing output utilities
//!
//! # Correctness Invariants
//!
//! Gantry maintains the following invariants:
//!
//! 1. No mutation before planning succeeds: cycles, unknown references,
//!    and missing required assets fail before any side effect
//! 2. A lib's mount is visible before its dependents' install commands
//!    run, and a lib's installs complete before any dependent's start
//! 3. Re-entry is idempotent: unchanged install command lists are
//!    skipped by fingerprint, per container
//! 4. Local working copies are never destructively overwritten

pub mod assets;
pub mod cli;
pub mod core;
pub mod engine;
pub mod repo;
pub mod runtime;
pub mod ui;
pub mod vcs;
