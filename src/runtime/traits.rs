//! runtime::traits
//!
//! ContainerRuntime trait definition.
//!
//! # Design
//!
//! The trait is async because every operation crosses a process or
//! daemon boundary. Command execution distinguishes "the command ran and
//! exited non-zero" (an `Ok` carrying the exit code; the engine decides
//! what that means) from "the command could not be run at all" (an
//! `Err`).

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::{ContainerId, MountPoint};

/// Errors from container-runtime operations.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    /// Binding a host path into the container failed.
    #[error("mount of '{container_path}' failed: {reason}")]
    MountFailed {
        /// The container-side path.
        container_path: MountPoint,
        /// Why the mount failed.
        reason: String,
    },

    /// Placing file contents into the container failed.
    #[error("placing '{container_path}' failed: {reason}")]
    PlaceFailed {
        /// The container-side path.
        container_path: MountPoint,
        /// Why the placement failed.
        reason: String,
    },

    /// The command could not be executed at all.
    #[error("exec failed: {reason}")]
    ExecFailed {
        /// Why execution failed.
        reason: String,
    },

    /// The container does not exist or the runtime is unreachable.
    #[error("container '{container}' unavailable: {reason}")]
    Unavailable {
        /// The container that was targeted.
        container: ContainerId,
        /// Why it is unavailable.
        reason: String,
    },
}

/// Container-runtime collaborator.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Make the contents of `host_path` visible at `container_path`
    /// inside the container.
    ///
    /// Idempotent: re-binding the same pair is safe.
    async fn bind_mount(
        &self,
        container: &ContainerId,
        host_path: &Path,
        container_path: &MountPoint,
    ) -> Result<(), RuntimeError>;

    /// Write `contents` to `container_path` inside the container,
    /// creating parent directories as needed.
    async fn place_file(
        &self,
        container: &ContainerId,
        container_path: &MountPoint,
        contents: &[u8],
    ) -> Result<(), RuntimeError>;

    /// Run a shell command inside the container and return its exit
    /// code.
    async fn exec(&self, container: &ContainerId, command: &str) -> Result<i32, RuntimeError>;
}
