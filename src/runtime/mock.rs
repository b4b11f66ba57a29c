//! runtime::mock
//!
//! Mock ContainerRuntime implementation for deterministic testing.
//!
//! # Design
//!
//! The mock records every operation in one ordered log, so tests can
//! assert cross-phase ordering (all mounts before the first install, lib
//! A's installs before lib B's). Exit codes and hard failures are
//! configurable per command.
//!
//! # Example
//!
//! ```
//! use gantry::runtime::{ContainerRuntime, MockRuntime};
//! use gantry::core::types::ContainerId;
//!
//! # tokio_test::block_on(async {
//! let runtime = MockRuntime::new();
//! let container = ContainerId::new("c1").unwrap();
//!
//! assert_eq!(runtime.exec(&container, "make install").await.unwrap(), 0);
//!
//! runtime.set_exit_code("make broken", 2);
//! assert_eq!(runtime.exec(&container, "make broken").await.unwrap(), 2);
//! # });
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{ContainerRuntime, RuntimeError};
use crate::core::types::{ContainerId, MountPoint};

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeOperation {
    /// A bind mount of (host path, container path).
    Mount(PathBuf, MountPoint),
    /// A file placement at the container path.
    Place(MountPoint, Vec<u8>),
    /// An executed command.
    Exec(String),
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct MockRuntimeInner {
    /// Ordered log of all operations across the container.
    operations: Vec<RuntimeOperation>,
    /// Exit codes per exact command; unlisted commands exit 0.
    exit_codes: HashMap<String, i32>,
    /// Container paths whose mount fails.
    fail_mounts: HashMap<MountPoint, String>,
    /// Container paths whose placement fails.
    fail_places: HashMap<MountPoint, String>,
}

/// Mock container runtime for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share
/// state.
#[derive(Debug, Clone, Default)]
pub struct MockRuntime {
    inner: Arc<Mutex<MockRuntimeInner>>,
}

impl MockRuntime {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure a command's exit code.
    pub fn set_exit_code(&self, command: &str, code: i32) {
        self.inner
            .lock()
            .unwrap()
            .exit_codes
            .insert(command.to_string(), code);
    }

    /// Make mounts at a container path fail.
    pub fn fail_mount_at(&self, container_path: &MountPoint, reason: &str) {
        self.inner
            .lock()
            .unwrap()
            .fail_mounts
            .insert(container_path.clone(), reason.to_string());
    }

    /// Make placements at a container path fail.
    pub fn fail_place_at(&self, container_path: &MountPoint, reason: &str) {
        self.inner
            .lock()
            .unwrap()
            .fail_places
            .insert(container_path.clone(), reason.to_string());
    }

    /// All operations performed, in order.
    pub fn operations(&self) -> Vec<RuntimeOperation> {
        self.inner.lock().unwrap().operations.clone()
    }

    /// Executed commands, in order.
    pub fn executed_commands(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .operations
            .iter()
            .filter_map(|op| match op {
                RuntimeOperation::Exec(command) => Some(command.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of times a command was executed.
    pub fn exec_count(&self, command: &str) -> usize {
        self.executed_commands()
            .iter()
            .filter(|c| c.as_str() == command)
            .count()
    }

    /// Index of an operation in the log, if present.
    pub fn position_of(&self, operation: &RuntimeOperation) -> Option<usize> {
        self.inner
            .lock()
            .unwrap()
            .operations
            .iter()
            .position(|op| op == operation)
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn bind_mount(
        &self,
        _container: &ContainerId,
        host_path: &Path,
        container_path: &MountPoint,
    ) -> Result<(), RuntimeError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(reason) = inner.fail_mounts.get(container_path) {
            return Err(RuntimeError::MountFailed {
                container_path: container_path.clone(),
                reason: reason.clone(),
            });
        }
        inner.operations.push(RuntimeOperation::Mount(
            host_path.to_path_buf(),
            container_path.clone(),
        ));
        Ok(())
    }

    async fn place_file(
        &self,
        _container: &ContainerId,
        container_path: &MountPoint,
        contents: &[u8],
    ) -> Result<(), RuntimeError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(reason) = inner.fail_places.get(container_path) {
            return Err(RuntimeError::PlaceFailed {
                container_path: container_path.clone(),
                reason: reason.clone(),
            });
        }
        inner.operations.push(RuntimeOperation::Place(
            container_path.clone(),
            contents.to_vec(),
        ));
        Ok(())
    }

    async fn exec(&self, _container: &ContainerId, command: &str) -> Result<i32, RuntimeError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .operations
            .push(RuntimeOperation::Exec(command.to_string()));
        Ok(inner.exit_codes.get(command).copied().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container() -> ContainerId {
        ContainerId::new("c1").unwrap()
    }

    #[tokio::test]
    async fn records_operations_in_order() {
        let runtime = MockRuntime::new();
        let mount = MountPoint::new("/libs/a").unwrap();

        runtime
            .bind_mount(&container(), Path::new("/cache/a"), &mount)
            .await
            .unwrap();
        runtime.exec(&container(), "make").await.unwrap();

        let ops = runtime.operations();
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0], RuntimeOperation::Mount(..)));
        assert!(matches!(ops[1], RuntimeOperation::Exec(..)));
    }

    #[tokio::test]
    async fn default_exit_code_is_zero() {
        let runtime = MockRuntime::new();
        assert_eq!(runtime.exec(&container(), "true").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn configured_exit_code() {
        let runtime = MockRuntime::new();
        runtime.set_exit_code("make broken", 2);
        assert_eq!(runtime.exec(&container(), "make broken").await.unwrap(), 2);
        assert_eq!(runtime.exec_count("make broken"), 1);
    }

    #[tokio::test]
    async fn configured_mount_failure() {
        let runtime = MockRuntime::new();
        let mount = MountPoint::new("/libs/a").unwrap();
        runtime.fail_mount_at(&mount, "read-only filesystem");

        let err = runtime
            .bind_mount(&container(), Path::new("/cache/a"), &mount)
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::MountFailed { .. }));
        // Failed mounts are not recorded.
        assert!(runtime.operations().is_empty());
    }
}
