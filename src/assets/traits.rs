//! assets::traits
//!
//! Asset store trait definition.
//!
//! # Design
//!
//! The `AssetStore` trait is the read-only lookup boundary the resolver
//! and planner consume. Registration (set/unset) lives on the concrete
//! stores, not on this trait: provisioning never mutates registration
//! state.
//!
//! Asset contents are frequently credentials. Implementations must never
//! log, print, or include asset bytes in error messages.

use thiserror::Error;

/// Errors from asset store operations.
///
/// Note: error messages intentionally never include asset contents.
#[derive(Debug, Error)]
pub enum AssetStoreError {
    /// The asset name is not usable as a registration key.
    #[error("invalid asset name: {0}")]
    InvalidName(String),

    /// Failed to read from the store.
    #[error("failed to read asset '{name}': {reason}")]
    ReadError {
        /// The asset being read.
        name: String,
        /// Why the read failed.
        reason: String,
    },

    /// Failed to write to the store.
    #[error("failed to write asset '{name}': {reason}")]
    WriteError {
        /// The asset being written.
        name: String,
        /// Why the write failed.
        reason: String,
    },
}

/// Validate an asset registration key.
///
/// Names key files in the registration directory, so they follow the
/// same shape rules as lib names: non-empty, no separators, no
/// traversal.
pub fn validate_name(name: &str) -> Result<(), AssetStoreError> {
    if name.is_empty() {
        return Err(AssetStoreError::InvalidName(
            "asset name cannot be empty".into(),
        ));
    }
    if name.starts_with('.') {
        return Err(AssetStoreError::InvalidName(
            "asset name cannot start with '.'".into(),
        ));
    }
    for c in name.chars() {
        if !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.') {
            return Err(AssetStoreError::InvalidName(format!(
                "asset name cannot contain '{c}'"
            )));
        }
    }
    Ok(())
}

/// Read-only asset lookup.
///
/// Implementations must be thread-safe (Send + Sync). `Ok(None)` means
/// "not registered" and is not an error; the resolver decides whether
/// absence is fatal based on the declaration's `required` flag.
pub trait AssetStore: Send + Sync {
    /// Look up a registered asset's contents by name.
    fn lookup(&self, name: &str) -> Result<Option<Vec<u8>>, AssetStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typical_names_validate() {
        for name in ["tls-cert", "netrc", "deploy_key.pem"] {
            assert!(validate_name(name).is_ok(), "{name} should validate");
        }
    }

    #[test]
    fn bad_names_rejected() {
        for name in ["", ".hidden", "a/b", "a b", "../escape"] {
            assert!(validate_name(name).is_err(), "{name} should be rejected");
        }
    }
}
