//! assets::resolver
//!
//! Required/optional resolution of asset declarations.
//!
//! # Semantics
//!
//! - Registered asset: resolved to its bytes for placement
//! - Unregistered and `required=true`: fatal, `MissingRequiredAsset`
//! - Unregistered and `required=false`: an explicit `Absent` resolution,
//!   not an error; the plan skips placement without failing the app
//!
//! The resolver is read-only; registration state belongs to the store.

use std::sync::Arc;

use thiserror::Error;

use super::traits::{AssetStore, AssetStoreError};
use crate::core::spec::AssetDeclaration;

/// Errors from asset resolution.
#[derive(Debug, Error)]
pub enum AssetError {
    /// A `required=true` asset is not registered.
    #[error("missing required asset '{name}'")]
    MissingRequiredAsset {
        /// The unregistered asset name.
        name: String,
    },

    /// The store itself failed.
    #[error(transparent)]
    Store(#[from] AssetStoreError),
}

/// Outcome of resolving one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedAsset {
    /// Registered; carry the declaration and contents to placement.
    Present {
        /// The declaration being satisfied.
        declaration: AssetDeclaration,
        /// Registered contents.
        contents: Vec<u8>,
    },
    /// Unregistered but optional; placement is skipped.
    Absent {
        /// The declaration that stays unsatisfied.
        declaration: AssetDeclaration,
    },
}

impl ResolvedAsset {
    /// The declaration this resolution belongs to.
    pub fn declaration(&self) -> &AssetDeclaration {
        match self {
            ResolvedAsset::Present { declaration, .. } => declaration,
            ResolvedAsset::Absent { declaration } => declaration,
        }
    }

    /// Whether placement will happen for this asset.
    pub fn is_present(&self) -> bool {
        matches!(self, ResolvedAsset::Present { .. })
    }
}

/// Maps declared asset names to registered contents.
#[derive(Clone)]
pub struct AssetResolver {
    store: Arc<dyn AssetStore>,
}

impl std::fmt::Debug for AssetResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetResolver").finish_non_exhaustive()
    }
}

impl AssetResolver {
    /// Create a resolver over a store.
    pub fn new(store: Arc<dyn AssetStore>) -> Self {
        Self { store }
    }

    /// Resolve one declaration.
    pub fn resolve(&self, declaration: &AssetDeclaration) -> Result<ResolvedAsset, AssetError> {
        match self.store.lookup(&declaration.name)? {
            Some(contents) => Ok(ResolvedAsset::Present {
                declaration: declaration.clone(),
                contents,
            }),
            None if declaration.required => Err(AssetError::MissingRequiredAsset {
                name: declaration.name.clone(),
            }),
            None => Ok(ResolvedAsset::Absent {
                declaration: declaration.clone(),
            }),
        }
    }

    /// Resolve a declaration list in order, failing on the first missing
    /// required asset.
    pub fn resolve_all(
        &self,
        declarations: &[AssetDeclaration],
    ) -> Result<Vec<ResolvedAsset>, AssetError> {
        declarations.iter().map(|d| self.resolve(d)).collect()
    }
}
