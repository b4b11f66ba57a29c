//! assets command - Manage the local asset registry.

use std::path::Path;

use anyhow::{Context as _, Result};

use crate::assets::FileAssetStore;
use crate::cli::args::AssetsAction;
use crate::core::config::Config;
use crate::ui::output::{self, Verbosity};

/// Register, unregister, or list local assets.
pub fn assets(project_dir: &Path, action: AssetsAction, verbosity: Verbosity) -> Result<()> {
    let config = Config::load(Some(project_dir))?.config;
    let store = FileAssetStore::new(config.paths().assets_dir());

    match action {
        AssetsAction::Set { name, path } => {
            store
                .set_from_file(&name, &path)
                .with_context(|| format!("failed to register '{name}'"))?;
            output::success(format!("registered asset '{name}'"), verbosity);
        }
        AssetsAction::Unset { name } => {
            store.unset(&name)?;
            output::success(format!("unregistered asset '{name}'"), verbosity);
        }
        AssetsAction::List => {
            for name in store.list()? {
                output::print(name, verbosity);
            }
        }
    }
    Ok(())
}
