//! forget command - Destroy a container's install record.

use std::path::Path;

use anyhow::Result;

use crate::core::config::Config;
use crate::core::types::ContainerId;
use crate::engine::RecordStore;
use crate::ui::output::{self, Verbosity};

/// Drop the install record for a removed container.
pub fn forget(project_dir: &Path, container: &str, verbosity: Verbosity) -> Result<()> {
    let container = ContainerId::new(container)?;
    let config = Config::load(Some(project_dir))?.config;

    RecordStore::new(config.paths()).delete(&container)?;
    output::success(format!("forgot container {container}"), verbosity);
    Ok(())
}
