//! assets::file_store
//!
//! Directory-backed asset registration store.
//!
//! # Storage
//!
//! - Each registered asset is one file at `<state_root>/assets/<name>`
//! - On Unix, registered files are written with mode 0600 (assets are
//!   typically credentials)
//! - Writes are atomic (write to temp file, then rename)
//! - Unregistering removes the file; the resolver then reports the asset
//!   absent
//!
//! # Example
//!
//! ```
//! use gantry::assets::{AssetStore, FileAssetStore};
//! use std::path::PathBuf;
//!
//! # let tmp = tempfile::tempdir().unwrap();
//! let store = FileAssetStore::new(tmp.path().to_path_buf());
//! store.set("tls-cert", b"-----BEGIN CERTIFICATE-----").unwrap();
//!
//! assert!(store.lookup("tls-cert").unwrap().is_some());
//! assert!(store.lookup("unregistered").unwrap().is_none());
//!
//! store.unset("tls-cert").unwrap();
//! assert!(store.lookup("tls-cert").unwrap().is_none());
//! ```

use std::fs;
use std::path::PathBuf;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use super::traits::{validate_name, AssetStore, AssetStoreError};

/// Directory-backed asset store.
///
/// This is the default registration store; the `assets` CLI surface
/// writes through it and the resolver reads through the [`AssetStore`]
/// trait.
#[derive(Debug, Clone)]
pub struct FileAssetStore {
    /// Directory holding one file per registered asset.
    dir: PathBuf,
}

impl FileAssetStore {
    /// Create a store over a registration directory.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// The registration directory.
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, AssetStoreError> {
        validate_name(name)?;
        Ok(self.dir.join(name))
    }

    /// Register (or replace) an asset's contents.
    pub fn set(&self, name: &str, contents: &[u8]) -> Result<(), AssetStoreError> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.dir).map_err(|e| AssetStoreError::WriteError {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        // Atomic replace: write beside the target, then rename over it.
        let tmp = self.dir.join(format!("{name}.tmp"));
        fs::write(&tmp, contents).map_err(|e| AssetStoreError::WriteError {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        #[cfg(unix)]
        {
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&tmp, perms).map_err(|e| AssetStoreError::WriteError {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        }

        fs::rename(&tmp, &path).map_err(|e| AssetStoreError::WriteError {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Register an asset from an existing file.
    pub fn set_from_file(&self, name: &str, source: &std::path::Path) -> Result<(), AssetStoreError> {
        let contents = fs::read(source).map_err(|e| AssetStoreError::ReadError {
            name: name.to_string(),
            reason: format!("cannot read '{}': {e}", source.display()),
        })?;
        self.set(name, &contents)
    }

    /// Remove a registration. Unregistered names are a no-op.
    pub fn unset(&self, name: &str) -> Result<(), AssetStoreError> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AssetStoreError::WriteError {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Names of all registered assets, sorted.
    pub fn list(&self) -> Result<Vec<String>, AssetStoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(AssetStoreError::ReadError {
                    name: "<list>".to_string(),
                    reason: e.to_string(),
                })
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| validate_name(name).is_ok())
            .collect();
        names.sort();
        Ok(names)
    }
}

impl AssetStore for FileAssetStore {
    fn lookup(&self, name: &str) -> Result<Option<Vec<u8>>, AssetStoreError> {
        let path = self.path_for(name)?;
        match fs::read(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AssetStoreError::ReadError {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
