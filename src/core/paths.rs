//! core::paths
//!
//! Centralized path routing for Gantry storage locations.
//!
//! # Architecture
//!
//! All on-host storage locations are routed through a centralized helper:
//! the repo cache, the per-container install records, the per-lib sync
//! locks, and the asset registry all hang off one root. No code outside
//! this module computes `<root>/...` paths directly.
//!
//! # Storage Layout
//!
//! All Gantry data is stored under the state root (default
//! `~/.gantry/`):
//! - `repos/<lib>` - Managed repo checkouts (the mount sources)
//! - `records/<container>.json` - Per-container install execution records
//! - `locks/<lib>.lock` - Per-lib sync lock files
//! - `assets/` - Registered asset files, keyed by name
//!
//! # Example
//!
//! ```
//! use gantry::core::paths::GantryPaths;
//! use gantry::core::types::LibName;
//! use std::path::PathBuf;
//!
//! let paths = GantryPaths::new(PathBuf::from("/var/lib/gantry"));
//! let lib = LibName::new("auth").unwrap();
//!
//! assert_eq!(paths.repo_path(&lib), PathBuf::from("/var/lib/gantry/repos/auth"));
//! assert_eq!(paths.lock_path(&lib), PathBuf::from("/var/lib/gantry/locks/auth.lock"));
//! ```

use std::path::PathBuf;

use crate::core::types::{ContainerId, LibName};

/// Directory name under the user's home when no explicit root is set.
const DEFAULT_ROOT_DIR: &str = ".gantry";

/// Centralized path routing for Gantry storage.
///
/// # Invariants
///
/// - Every storage location is a child of `root`
/// - Lib and container names are validated types, so path components are
///   always safe (no separators, no traversal)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GantryPaths {
    /// State root everything hangs off.
    pub root: PathBuf,
}

impl GantryPaths {
    /// Create paths rooted at an explicit directory.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create paths at the default per-user location (`~/.gantry`).
    ///
    /// Falls back to a relative `.gantry` if the home directory cannot be
    /// determined (hermetic test environments).
    pub fn default_location() -> Self {
        let root = dirs::home_dir()
            .map(|home| home.join(DEFAULT_ROOT_DIR))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT_DIR));
        Self { root }
    }

    /// Directory holding managed repo checkouts.
    pub fn repos_dir(&self) -> PathBuf {
        self.root.join("repos")
    }

    /// The managed checkout location for one lib.
    ///
    /// Local-path repo targets are used in place and never live here.
    pub fn repo_path(&self, lib: &LibName) -> PathBuf {
        self.repos_dir().join(lib.as_str())
    }

    /// Directory holding per-container install records.
    pub fn records_dir(&self) -> PathBuf {
        self.root.join("records")
    }

    /// The install record file for one container.
    pub fn record_path(&self, container: &ContainerId) -> PathBuf {
        self.records_dir().join(format!("{container}.json"))
    }

    /// Directory holding per-lib sync lock files.
    pub fn locks_dir(&self) -> PathBuf {
        self.root.join("locks")
    }

    /// The sync lock file for one lib.
    pub fn lock_path(&self, lib: &LibName) -> PathBuf {
        self.locks_dir().join(format!("{lib}.lock"))
    }

    /// Directory holding registered asset files.
    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    /// Create the full directory layout.
    ///
    /// Idempotent; safe to call on every startup.
    pub fn ensure_layout(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.repos_dir())?;
        std::fs::create_dir_all(self.records_dir())?;
        std::fs::create_dir_all(self.locks_dir())?;
        std::fs::create_dir_all(self.assets_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> GantryPaths {
        GantryPaths::new(PathBuf::from("/var/lib/gantry"))
    }

    #[test]
    fn repo_path_is_keyed_by_lib() {
        let lib = LibName::new("auth").unwrap();
        assert_eq!(
            paths().repo_path(&lib),
            PathBuf::from("/var/lib/gantry/repos/auth")
        );
    }

    #[test]
    fn record_path_is_keyed_by_container() {
        let container = ContainerId::new("c1d2e3").unwrap();
        assert_eq!(
            paths().record_path(&container),
            PathBuf::from("/var/lib/gantry/records/c1d2e3.json")
        );
    }

    #[test]
    fn lock_path_has_lock_extension() {
        let lib = LibName::new("cache").unwrap();
        assert_eq!(
            paths().lock_path(&lib),
            PathBuf::from("/var/lib/gantry/locks/cache.lock")
        );
    }

    #[test]
    fn ensure_layout_creates_all_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = GantryPaths::new(tmp.path().join("state"));
        paths.ensure_layout().unwrap();

        assert!(paths.repos_dir().is_dir());
        assert!(paths.records_dir().is_dir());
        assert!(paths.locks_dir().is_dir());
        assert!(paths.assets_dir().is_dir());

        // Idempotent
        paths.ensure_layout().unwrap();
    }

    #[test]
    fn default_location_is_under_home() {
        let paths = GantryPaths::default_location();
        assert!(paths.root.ends_with(".gantry"));
    }
}
