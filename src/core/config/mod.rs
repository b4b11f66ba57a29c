//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Gantry has two configuration scopes:
//! - **Global**: User-level settings
//! - **Project**: Per-project overrides
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Project config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$GANTRY_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/gantry/config.toml`
//! 3. `~/.gantry/config.toml` (canonical write location)
//!
//! # Project Config Location
//!
//! `.gantry/config.toml` under the project directory.
//!
//! # Example
//!
//! ```no_run
//! use gantry::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/path/to/project"))).unwrap();
//! let config = result.config;
//!
//! println!("State root: {}", config.state_root().display());
//! println!("Default branch: {}", config.default_branch());
//! println!("Sync jobs: {}", config.sync_jobs());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, ProjectConfig, SyncDefaults};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::paths::GantryPaths;
use crate::core::spec::DEFAULT_BRANCH;

/// Sync parallelism when no config names one.
const DEFAULT_SYNC_JOBS: usize = 4;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Paths the config was read from, for diagnostics.
    pub sources: Vec<PathBuf>,
}

/// Merged configuration from all sources.
///
/// Accessor methods apply precedence rules automatically: project config
/// overrides global config, defaults fill the rest.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Project configuration (if a project directory was given)
    pub project: Option<ProjectConfig>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `project_dir` is provided, also loads project-scope config.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or
    /// fail validation. Missing config files are not an error (defaults
    /// are used).
    pub fn load(project_dir: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let mut sources = Vec::new();

        let global = match Self::global_location() {
            Some(path) => {
                sources.push(path.clone());
                Self::read_toml::<GlobalConfig>(&path)?
            }
            None => GlobalConfig::default(),
        };

        let project = match project_dir {
            Some(dir) => {
                let path = Self::project_config_path(dir);
                if path.exists() {
                    sources.push(path.clone());
                    Some(Self::read_toml::<ProjectConfig>(&path)?)
                } else {
                    None
                }
            }
            None => None,
        };

        global.validate()?;
        if let Some(ref p) = project {
            p.validate()?;
        }

        Ok(ConfigLoadResult {
            config: Config { global, project },
            sources,
        })
    }

    /// Find the first existing global config file.
    fn global_location() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("GANTRY_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("gantry/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            let path = home.join(".gantry/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the canonical path for global config (`~/.gantry/config.toml`).
    pub fn global_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".gantry/config.toml"))
    }

    /// Get the project config path for a project directory.
    pub fn project_config_path(project_dir: &Path) -> PathBuf {
        project_dir.join(".gantry/config.toml")
    }

    // =========================================================================
    // Resolved accessors (precedence applied)
    // =========================================================================

    /// The state root everything is stored under.
    pub fn state_root(&self) -> PathBuf {
        self.global
            .state_root
            .clone()
            .unwrap_or_else(|| GantryPaths::default_location().root)
    }

    /// Storage paths derived from the resolved state root.
    pub fn paths(&self) -> GantryPaths {
        GantryPaths::new(self.state_root())
    }

    /// The branch used when a repo target names none.
    pub fn default_branch(&self) -> &str {
        self.project
            .as_ref()
            .and_then(|p| p.default_branch.as_deref())
            .or(self.global.default_branch.as_deref())
            .unwrap_or(DEFAULT_BRANCH)
    }

    /// Maximum concurrent repo syncs.
    pub fn sync_jobs(&self) -> usize {
        self.project
            .as_ref()
            .and_then(|p| p.sync.as_ref())
            .and_then(|s| s.jobs)
            .or_else(|| self.global.sync.as_ref().and_then(|s| s.jobs))
            .unwrap_or(DEFAULT_SYNC_JOBS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_with_no_files() {
        let config = Config::default();
        assert_eq!(config.default_branch(), "master");
        assert_eq!(config.sync_jobs(), DEFAULT_SYNC_JOBS);
    }

    #[test]
    fn project_overrides_global() {
        let config = Config {
            global: GlobalConfig {
                default_branch: Some("main".to_string()),
                sync: Some(SyncDefaults { jobs: Some(8) }),
                ..Default::default()
            },
            project: Some(ProjectConfig {
                default_branch: Some("develop".to_string()),
                sync: None,
            }),
        };
        assert_eq!(config.default_branch(), "develop");
        // Project has no sync section; global applies
        assert_eq!(config.sync_jobs(), 8);
    }

    #[test]
    fn state_root_from_global() {
        let config = Config {
            global: GlobalConfig {
                state_root: Some(PathBuf::from("/srv/gantry")),
                ..Default::default()
            },
            project: None,
        };
        assert_eq!(config.state_root(), PathBuf::from("/srv/gantry"));
        assert_eq!(
            config.paths().repos_dir(),
            PathBuf::from("/srv/gantry/repos")
        );
    }

    #[test]
    fn load_reads_project_file() {
        let tmp = tempfile::tempdir().unwrap();
        let project_dir = tmp.path();
        fs::create_dir_all(project_dir.join(".gantry")).unwrap();
        fs::write(
            project_dir.join(".gantry/config.toml"),
            "default_branch = \"main\"\n",
        )
        .unwrap();

        let result = Config::load(Some(project_dir)).unwrap();
        assert_eq!(result.config.default_branch(), "main");
        assert!(result
            .sources
            .iter()
            .any(|p| p.ends_with(".gantry/config.toml")));
    }

    #[test]
    fn load_with_missing_project_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let result = Config::load(Some(tmp.path())).unwrap();
        assert!(result.config.project.is_none());
    }

    #[test]
    fn parse_error_is_reported_with_path() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join(".gantry")).unwrap();
        fs::write(tmp.path().join(".gantry/config.toml"), "not valid toml [").unwrap();

        let err = Config::load(Some(tmp.path())).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
