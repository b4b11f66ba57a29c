//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Calls the engine (or a store) to do the work
//! 3. Formats and displays output
//!
//! Handlers do NOT sync repos or touch containers directly; everything
//! flows through the [`crate::engine::Provisioner`].

mod assets_cmd;
mod completion;
mod forget;
mod provision;
mod repos;
mod resolve;

pub use assets_cmd::assets;
pub use completion::completion;
pub use forget::forget;
pub use provision::provision;
pub use repos::repos;
pub use resolve::resolve;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::specfile::SpecDocument;
use crate::assets::FileAssetStore;
use crate::core::config::Config;
use crate::engine::Provisioner;
use crate::runtime::DockerCli;
use crate::vcs::Git2Client;

/// Everything a provisioning command needs: the loaded spec document, a
/// provisioner wired to the real collaborators, and the storage layout.
pub(crate) struct ProvisionContext {
    pub document: SpecDocument,
    pub provisioner: Provisioner,
    pub paths: crate::core::paths::GantryPaths,
}

/// Load config and specs for a project directory and wire the engine.
pub(crate) fn provision_context(project_dir: &Path) -> Result<ProvisionContext> {
    let config = Config::load(Some(project_dir))
        .context("failed to load configuration")?
        .config;
    let paths = config.paths();
    paths
        .ensure_layout()
        .context("failed to create state directories")?;

    let document = SpecDocument::load(project_dir)?;
    let universe = document.universe()?;

    let provisioner = Provisioner::new(
        universe,
        Arc::new(Git2Client::new()),
        Arc::new(FileAssetStore::new(paths.assets_dir())),
        Arc::new(DockerCli::new()),
        &config,
    );

    Ok(ProvisionContext {
        document,
        provisioner,
        paths,
    })
}

/// Look an app up in the document or fail with the known names.
pub(crate) fn find_app<'a>(
    document: &'a SpecDocument,
    name: &str,
) -> Result<&'a crate::core::spec::AppSpec> {
    document.app(name).ok_or_else(|| {
        let known: Vec<&str> = document.apps.iter().map(|a| a.name.as_str()).collect();
        anyhow::anyhow!(
            "unknown app '{name}' (known apps: {})",
            if known.is_empty() {
                "none".to_string()
            } else {
                known.join(", ")
            }
        )
    })
}
