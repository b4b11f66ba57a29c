//! assets
//!
//! Asset registration lookup and resolution.
//!
//! # Architecture
//!
//! Assets are locally registered files (credentials, key material,
//! machine-local config) injected into containers at fixed paths.
//! Registration happens out-of-band through the store surface; the
//! resolver consumes a read-only [`traits::AssetStore`] lookup, so tests
//! swap in an in-memory double and the engine never touches registration
//! state.
//!
//! # Modules
//!
//! - [`traits`] - The `AssetStore` lookup trait and typed errors
//! - [`file_store`] - Directory-backed registration store
//! - [`memory`] - In-memory store for tests
//! - [`resolver`] - Required/optional resolution semantics

pub mod file_store;
pub mod memory;
pub mod resolver;
pub mod traits;

pub use file_store::FileAssetStore;
pub use memory::MemoryAssetStore;
pub use resolver::{AssetError, AssetResolver, ResolvedAsset};
pub use traits::{AssetStore, AssetStoreError};
