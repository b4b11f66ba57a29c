//! core::spec
//!
//! In-memory spec records for libs and apps.
//!
//! # Architecture
//!
//! Spec parsing is an external collaborator: by the time records reach this
//! crate they are syntactically valid. This module holds the typed shapes
//! and re-validates only the relational invariants the engine depends on
//! (non-empty repo targets, resolvable protocol hints). Cross-record
//! invariants (unknown references, cycles) live in [`crate::core::graph`].
//!
//! # Invariants
//!
//! - `mount` and `repo` are always present and non-empty
//! - `depends.libs` order is preserved as declared (it is the topological
//!   tie-break)
//! - The optional `test` descriptor is carried opaquely and never
//!   interpreted here

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{LibName, MountPoint};

/// The branch checked out when a repo target does not name one.
pub const DEFAULT_BRANCH: &str = "master";

/// Errors from spec-level validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    /// Repo locator is empty.
    #[error("lib '{lib}' has an empty repo locator")]
    EmptyLocator {
        /// The lib with the bad target
        lib: LibName,
    },

    /// Duplicate lib name in a spec set.
    #[error("duplicate lib spec: {0}")]
    DuplicateLib(LibName),
}

/// Transport used to reach a repo locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    /// HTTPS clone/fetch.
    Https,
    /// SSH clone/fetch.
    Ssh,
    /// Local filesystem path, used in place without network access.
    LocalPath,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Protocol::Https => "https",
            Protocol::Ssh => "ssh",
            Protocol::LocalPath => "local-path",
        };
        write!(f, "{s}")
    }
}

/// A declared repo target: where a lib's source lives and which branch
/// the engine keeps checked out.
///
/// # Example
///
/// ```
/// use gantry::core::spec::{Protocol, RepoTarget};
///
/// let target = RepoTarget::new("https://example.com/org/lib.git");
/// assert_eq!(target.branch, "master");
/// assert_eq!(target.resolved_protocol(), Some(Protocol::Https));
///
/// let local = RepoTarget::new("/home/dev/repos/lib");
/// assert_eq!(local.resolved_protocol(), Some(Protocol::LocalPath));
///
/// // Unrecognized schemes resolve to None (UnsupportedProtocol downstream)
/// let odd = RepoTarget::new("ftp://example.com/lib");
/// assert_eq!(odd.resolved_protocol(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoTarget {
    /// Source locator: a URL or an absolute local path.
    pub locator: String,

    /// Explicit protocol hint; inferred from the locator when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,

    /// Branch to keep checked out.
    #[serde(default = "default_branch")]
    pub branch: String,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

impl RepoTarget {
    /// Create a target for a locator on the default branch.
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            protocol: None,
            branch: default_branch(),
        }
    }

    /// Create a target pinned to a branch.
    pub fn with_branch(locator: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            protocol: None,
            branch: branch.into(),
        }
    }

    /// Resolve the transport for this target.
    ///
    /// The explicit hint wins. Otherwise: locators beginning with `https`
    /// use HTTPS, filesystem paths are local, `ssh://`/`git://` and
    /// scp-style `user@host:path` locators use SSH. Any other URL scheme
    /// resolves to `None` and is reported as `UnsupportedProtocol` by the
    /// syncer.
    pub fn resolved_protocol(&self) -> Option<Protocol> {
        if let Some(hint) = self.protocol {
            return Some(hint);
        }
        let locator = self.locator.as_str();
        if locator.starts_with("https") {
            return Some(Protocol::Https);
        }
        if locator.starts_with('/') || locator.starts_with("./") || locator.starts_with("../") {
            return Some(Protocol::LocalPath);
        }
        if let Some((scheme, _)) = locator.split_once("://") {
            return match scheme {
                "ssh" | "git" => Some(Protocol::Ssh),
                _ => None,
            };
        }
        // scp-style (git@host:path) and bare host:path locators
        Some(Protocol::Ssh)
    }

    /// Whether this target is a local working copy used in place.
    pub fn is_local(&self) -> bool {
        self.resolved_protocol() == Some(Protocol::LocalPath)
    }
}

/// A declared asset: a locally registered file injected into the
/// container at a fixed path.
///
/// `required` defaults to true. Optional assets that are unregistered at
/// provisioning time are skipped without failing the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDeclaration {
    /// Registration key the asset was stored under.
    pub name: String,

    /// Target path inside the container.
    pub target: MountPoint,

    /// Whether absence at provisioning time fails the app.
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl AssetDeclaration {
    /// Create a required asset declaration.
    pub fn required(name: impl Into<String>, target: MountPoint) -> Self {
        Self {
            name: name.into(),
            target,
            required: true,
        }
    }

    /// Create an optional asset declaration.
    pub fn optional(name: impl Into<String>, target: MountPoint) -> Self {
        Self {
            name: name.into(),
            target,
            required: false,
        }
    }
}

/// A lib spec: an externally maintained source repo with install and
/// dependency metadata.
///
/// # Example
///
/// ```
/// use gantry::core::spec::{LibSpec, RepoTarget};
/// use gantry::core::types::{LibName, MountPoint};
///
/// let spec = LibSpec {
///     name: LibName::new("auth").unwrap(),
///     repo: RepoTarget::new("git@example.com:org/auth.git"),
///     mount: MountPoint::new("/libs/auth").unwrap(),
///     assets: vec![],
///     install: vec!["make install".to_string()],
///     depends: vec![],
///     test: None,
/// };
/// assert!(spec.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibSpec {
    /// Lib identity.
    pub name: LibName,

    /// Where the lib's source lives.
    pub repo: RepoTarget,

    /// Where the synced repo contents land in dependent containers.
    pub mount: MountPoint,

    /// Ordered asset declarations.
    #[serde(default)]
    pub assets: Vec<AssetDeclaration>,

    /// Ordered install commands, run once per relevant lifecycle event.
    #[serde(default)]
    pub install: Vec<String>,

    /// Libs this lib depends on, in declared order.
    #[serde(default)]
    pub depends: Vec<LibName>,

    /// Opaque test descriptor; carried but never interpreted by the core.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<serde_json::Value>,
}

impl LibSpec {
    /// Re-check the record-local invariants.
    ///
    /// `mount` is enforced by construction ([`MountPoint`]); the locator
    /// is the remaining always-present field that serde cannot guarantee
    /// non-empty.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.repo.locator.trim().is_empty() {
            return Err(SpecError::EmptyLocator {
                lib: self.name.clone(),
            });
        }
        Ok(())
    }
}

/// An app spec: the consumer container definition.
///
/// Apps declare direct lib dependencies and their own startup commands.
/// `once` commands run on the first successful container creation only;
/// `always` commands run on every start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSpec {
    /// App identity.
    pub name: LibName,

    /// Direct lib dependencies, in declared order.
    #[serde(default)]
    pub libs: Vec<LibName>,

    /// Commands run on first successful container creation only.
    #[serde(default)]
    pub once: Vec<String>,

    /// Commands run on every container start.
    #[serde(default)]
    pub always: Vec<String>,
}

/// The universe of known lib specs, in declaration order.
///
/// Declaration order is load-bearing: it is the deterministic tie-break
/// for libs with no ordering constraint between them, so plans are
/// reproducible across runs.
#[derive(Debug, Clone, Default)]
pub struct SpecSet {
    specs: Vec<LibSpec>,
}

impl SpecSet {
    /// Create an empty spec set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from specs in declaration order.
    ///
    /// # Errors
    ///
    /// Returns `SpecError::DuplicateLib` on a repeated name, or the first
    /// record-local validation failure.
    pub fn from_specs(specs: impl IntoIterator<Item = LibSpec>) -> Result<Self, SpecError> {
        let mut set = Self::new();
        for spec in specs {
            set.insert(spec)?;
        }
        Ok(set)
    }

    /// Add a spec, preserving declaration order.
    pub fn insert(&mut self, spec: LibSpec) -> Result<(), SpecError> {
        spec.validate()?;
        if self.get(&spec.name).is_some() {
            return Err(SpecError::DuplicateLib(spec.name));
        }
        self.specs.push(spec);
        Ok(())
    }

    /// Look up a spec by name.
    pub fn get(&self, name: &LibName) -> Option<&LibSpec> {
        self.specs.iter().find(|s| &s.name == name)
    }

    /// Iterate specs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &LibSpec> {
        self.specs.iter()
    }

    /// Number of known specs.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
