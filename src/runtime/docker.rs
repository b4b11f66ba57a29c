//! runtime::docker
//!
//! docker-CLI-backed ContainerRuntime implementation.
//!
//! # Design
//!
//! Shells out to the `docker` binary rather than speaking the daemon API
//! directly: the CLI inherits the operator's auth, contexts, and daemon
//! selection. Mount binding for a running container is realized by
//! copying the synced tree in (`docker cp`), which matches the
//! reconcile-on-restart model: the engine re-syncs sources on every
//! lifecycle event anyway.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tracing::debug;

use super::traits::{ContainerRuntime, RuntimeError};
use crate::core::types::{ContainerId, MountPoint};

/// docker-CLI adapter.
#[derive(Debug, Clone)]
pub struct DockerCli {
    /// The binary to invoke, normally `docker`.
    binary: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
        }
    }
}

impl DockerCli {
    /// Create an adapter invoking the standard `docker` binary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an adapter invoking a specific binary (e.g. `podman`).
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output, RuntimeError> {
        debug!(binary = %self.binary, ?args, "runtime call");
        tokio::process::Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| RuntimeError::ExecFailed {
                reason: format!("failed to invoke '{}': {e}", self.binary),
            })
    }

    fn stderr_of(output: &std::process::Output) -> String {
        String::from_utf8_lossy(&output.stderr).trim().to_string()
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn bind_mount(
        &self,
        container: &ContainerId,
        host_path: &Path,
        container_path: &MountPoint,
    ) -> Result<(), RuntimeError> {
        // Ensure the target directory exists, then copy the tree in.
        let mkdir = format!("mkdir -p {}", container_path.as_str());
        let output = self
            .run(&["exec", container.as_str(), "sh", "-c", &mkdir])
            .await?;
        if !output.status.success() {
            return Err(RuntimeError::MountFailed {
                container_path: container_path.clone(),
                reason: Self::stderr_of(&output),
            });
        }

        let source = format!("{}/.", host_path.display());
        let dest = format!("{container}:{container_path}");
        let output = self.run(&["cp", &source, &dest]).await?;
        if !output.status.success() {
            return Err(RuntimeError::MountFailed {
                container_path: container_path.clone(),
                reason: Self::stderr_of(&output),
            });
        }
        Ok(())
    }

    async fn place_file(
        &self,
        container: &ContainerId,
        container_path: &MountPoint,
        contents: &[u8],
    ) -> Result<(), RuntimeError> {
        let parent = match container_path.as_str().rsplit_once('/') {
            Some((parent, _)) if !parent.is_empty() => parent.to_string(),
            _ => "/".to_string(),
        };
        let mkdir = format!("mkdir -p {parent}");
        let output = self
            .run(&["exec", container.as_str(), "sh", "-c", &mkdir])
            .await?;
        if !output.status.success() {
            return Err(RuntimeError::PlaceFailed {
                container_path: container_path.clone(),
                reason: Self::stderr_of(&output),
            });
        }

        // Stage the contents on the host, then copy in.
        let staged = std::env::temp_dir().join(format!("gantry-asset-{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&staged, contents)
            .await
            .map_err(|e| RuntimeError::PlaceFailed {
                container_path: container_path.clone(),
                reason: format!("failed to stage contents: {e}"),
            })?;

        let source = staged.display().to_string();
        let dest = format!("{container}:{container_path}");
        let result = self.run(&["cp", &source, &dest]).await;
        let _ = tokio::fs::remove_file(&staged).await;

        let output = result?;
        if !output.status.success() {
            return Err(RuntimeError::PlaceFailed {
                container_path: container_path.clone(),
                reason: Self::stderr_of(&output),
            });
        }
        Ok(())
    }

    async fn exec(&self, container: &ContainerId, command: &str) -> Result<i32, RuntimeError> {
        let output = self
            .run(&["exec", container.as_str(), "sh", "-c", command])
            .await?;
        Ok(output.status.code().unwrap_or(-1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binary_is_docker() {
        let cli = DockerCli::new();
        assert_eq!(cli.binary, "docker");
    }

    #[test]
    fn custom_binary() {
        let cli = DockerCli::with_binary("podman");
        assert_eq!(cli.binary, "podman");
    }

    #[tokio::test]
    async fn missing_binary_is_exec_failed() {
        let cli = DockerCli::with_binary("definitely-not-a-container-runtime");
        let container = ContainerId::new("c1").unwrap();
        let err = cli.exec(&container, "true").await.unwrap_err();
        assert!(matches!(err, RuntimeError::ExecFailed { .. }));
    }
}
