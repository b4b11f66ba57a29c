//! repos command - Show on-disk repo state for all known libs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use super::provision_context;
use crate::ui::output::{self, Verbosity};
use crate::vcs::{Git2Client, VcsClient};

/// List each lib's locator, branch, and local copy state.
pub async fn repos(project_dir: &Path, verbosity: Verbosity) -> Result<()> {
    let ctx = provision_context(project_dir)?;
    let vcs: Arc<dyn VcsClient> = Arc::new(Git2Client::new());

    for spec in ctx.provisioner.universe().iter() {
        let local_path = if spec.repo.is_local() {
            PathBuf::from(&spec.repo.locator)
        } else {
            ctx.paths.repo_path(&spec.name)
        };

        let state = if vcs.is_repo(&local_path).await {
            match vcs.head_commit(&local_path).await {
                Ok(commit) => format!("present @ {}", &commit[..commit.len().min(12)]),
                Err(_) => "present".to_string(),
            }
        } else {
            "unsynced".to_string()
        };

        output::print(
            format!(
                "{:<24} {:<10} {:<50} {}",
                spec.name, spec.repo.branch, spec.repo.locator, state
            ),
            verbosity,
        );
    }
    Ok(())
}
