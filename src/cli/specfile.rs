//! cli::specfile
//!
//! Loading of pre-validated spec records.
//!
//! # Boundary
//!
//! Parsing the human-authored spec format is an external collaborator's
//! job. What this module loads is that collaborator's **output**: a JSON
//! document of already-structured [`LibSpec`] and [`AppSpec`] records at
//! `.gantry/specs.json` under the project directory. Only relational
//! invariants are re-checked downstream (unknown references, cycles).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::core::spec::{AppSpec, LibSpec, SpecError, SpecSet};

/// Location of the assembled spec document under a project directory.
const SPECS_PATH: &str = ".gantry/specs.json";

/// Errors from spec document loading.
#[derive(Debug, Error)]
pub enum SpecFileError {
    /// No spec document at the expected location.
    #[error("no spec document found at '{path}'")]
    NotFound {
        /// The location that was checked.
        path: PathBuf,
    },

    /// The document could not be read.
    #[error("failed to read '{path}': {source}")]
    ReadError {
        /// The document path.
        path: PathBuf,
        /// The I/O failure.
        source: std::io::Error,
    },

    /// The document is not valid record JSON.
    #[error("failed to parse '{path}': {message}")]
    ParseError {
        /// The document path.
        path: PathBuf,
        /// The deserialization failure.
        message: String,
    },

    /// Record-level validation failed.
    #[error(transparent)]
    Spec(#[from] SpecError),
}

/// An assembled spec document: the known libs and apps.
#[derive(Debug, Clone, Deserialize)]
pub struct SpecDocument {
    /// All known lib specs, in declaration order.
    #[serde(default)]
    pub libs: Vec<LibSpec>,

    /// All known app specs.
    #[serde(default)]
    pub apps: Vec<AppSpec>,
}

impl SpecDocument {
    /// Load the spec document for a project directory.
    pub fn load(project_dir: &Path) -> Result<Self, SpecFileError> {
        let path = project_dir.join(SPECS_PATH);
        if !path.exists() {
            return Err(SpecFileError::NotFound { path });
        }

        let contents =
            std::fs::read_to_string(&path).map_err(|source| SpecFileError::ReadError {
                path: path.clone(),
                source,
            })?;

        serde_json::from_str(&contents).map_err(|e| SpecFileError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// The lib universe as a validated spec set.
    pub fn universe(&self) -> Result<SpecSet, SpecFileError> {
        Ok(SpecSet::from_specs(self.libs.iter().cloned())?)
    }

    /// Find an app by name.
    pub fn app(&self, name: &str) -> Option<&AppSpec> {
        self.apps.iter().find(|app| app.name.as_str() == name)
    }
}
