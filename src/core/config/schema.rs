//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$GANTRY_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/gantry/config.toml`
//! 3. `~/.gantry/config.toml` (canonical write location)
//!
//! # Project Config
//!
//! Located at `.gantry/config.toml` under the project directory.
//!
//! # Validation
//!
//! Config values are validated after parsing to ensure they conform to
//! expected formats (e.g., sync_jobs must be non-zero).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// state_root = "/var/lib/gantry"
/// default_branch = "master"
///
/// [sync]
/// jobs = 8
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Root directory for repo cache, records, locks, and assets
    pub state_root: Option<PathBuf>,

    /// Branch checked out when a repo target names none
    pub default_branch: Option<String>,

    /// Sync settings
    pub sync: Option<SyncDefaults>,
}

impl GlobalConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref branch) = self.default_branch {
            if branch.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "default_branch cannot be empty".to_string(),
                ));
            }
        }
        if let Some(ref sync) = self.sync {
            sync.validate()?;
        }
        Ok(())
    }
}

/// Sync defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SyncDefaults {
    /// Maximum concurrent repo syncs
    pub jobs: Option<usize>,
}

impl SyncDefaults {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "sync.jobs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Project configuration (project scope).
///
/// Overrides global settings for one project directory.
///
/// # Example
///
/// ```toml
/// default_branch = "main"
///
/// [sync]
/// jobs = 2
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Branch checked out when a repo target names none
    pub default_branch: Option<String>,

    /// Sync settings
    pub sync: Option<SyncDefaults>,
}

impl ProjectConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref branch) = self.default_branch {
            if branch.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "default_branch cannot be empty".to_string(),
                ));
            }
        }
        if let Some(ref sync) = self.sync {
            sync.validate()?;
        }
        Ok(())
    }
}
