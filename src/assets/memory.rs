//! assets::memory
//!
//! In-memory asset store for deterministic testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::traits::{validate_name, AssetStore, AssetStoreError};

/// In-memory asset store.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share
/// state.
///
/// # Example
///
/// ```
/// use gantry::assets::{AssetStore, MemoryAssetStore};
///
/// let store = MemoryAssetStore::new();
/// store.set("tls-cert", b"pem bytes");
///
/// assert!(store.lookup("tls-cert").unwrap().is_some());
/// assert!(store.lookup("unregistered").unwrap().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryAssetStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) an asset.
    pub fn set(&self, name: &str, contents: &[u8]) {
        self.entries
            .lock()
            .unwrap()
            .insert(name.to_string(), contents.to_vec());
    }

    /// Remove a registration.
    pub fn unset(&self, name: &str) {
        self.entries.lock().unwrap().remove(name);
    }
}

impl AssetStore for MemoryAssetStore {
    fn lookup(&self, name: &str) -> Result<Option<Vec<u8>>, AssetStoreError> {
        validate_name(name)?;
        Ok(self.entries.lock().unwrap().get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_lookup() {
        let store = MemoryAssetStore::new();
        store.set("key", b"value");
        assert_eq!(store.lookup("key").unwrap().as_deref(), Some(b"value".as_slice()));
    }

    #[test]
    fn unset_removes() {
        let store = MemoryAssetStore::new();
        store.set("key", b"value");
        store.unset("key");
        assert!(store.lookup("key").unwrap().is_none());
    }

    #[test]
    fn clones_share_state() {
        let store = MemoryAssetStore::new();
        let view = store.clone();
        store.set("key", b"value");
        assert!(view.lookup("key").unwrap().is_some());
    }
}
