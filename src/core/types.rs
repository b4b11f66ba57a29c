//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`LibName`] - Validated lib (or app) name
//! - [`ContainerId`] - Validated container identifier
//! - [`MountPoint`] - Absolute container mount path
//! - [`Fingerprint`] - Hash of an install command set for idempotency checks
//! - [`UtcTimestamp`] - RFC3339 timestamp
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use gantry::core::types::{LibName, MountPoint};
//!
//! // Valid constructions
//! let lib = LibName::new("redis-client").unwrap();
//! let mount = MountPoint::new("/libs/redis-client").unwrap();
//!
//! // Invalid constructions fail at creation time
//! assert!(LibName::new("has space").is_err());
//! assert!(MountPoint::new("relative/path").is_err());
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid lib name: {0}")]
    InvalidLibName(String),

    #[error("invalid container id: {0}")]
    InvalidContainerId(String),

    #[error("invalid mount point: {0}")]
    InvalidMountPoint(String),
}

/// A validated lib or app name.
///
/// Names key the dependency graph, the repo cache, and the per-container
/// install record, so they must be safe to embed in paths and lock file
/// names:
/// - Cannot be empty
/// - Cannot start with `.` or `-`
/// - May contain only alphanumerics, `-`, `_`, and `.`
/// - Cannot contain `..`
///
/// # Example
///
/// ```
/// use gantry::core::types::LibName;
///
/// let name = LibName::new("auth-lib").unwrap();
/// assert_eq!(name.as_str(), "auth-lib");
///
/// assert!(LibName::new("").is_err());
/// assert!(LibName::new(".hidden").is_err());
/// assert!(LibName::new("a/b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LibName(String);

impl LibName {
    /// Create a new validated lib name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidLibName` if the name cannot safely key
    /// cache paths and record entries.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidLibName("name cannot be empty".into()));
        }
        if name.starts_with('.') {
            return Err(TypeError::InvalidLibName(
                "name cannot start with '.'".into(),
            ));
        }
        if name.starts_with('-') {
            return Err(TypeError::InvalidLibName(
                "name cannot start with '-'".into(),
            ));
        }
        if name.contains("..") {
            return Err(TypeError::InvalidLibName("name cannot contain '..'".into()));
        }
        for c in name.chars() {
            if !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.') {
                return Err(TypeError::InvalidLibName(format!(
                    "name cannot contain '{c}'"
                )));
            }
        }
        Ok(())
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LibName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<LibName> for String {
    fn from(name: LibName) -> Self {
        name.0
    }
}

impl AsRef<str> for LibName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LibName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated container identifier.
///
/// Container ids come from the container runtime and key the persisted
/// install record. They are restricted to the characters runtimes actually
/// emit (hex ids and user-assigned names): alphanumerics, `-`, `_`, `.`.
///
/// # Example
///
/// ```
/// use gantry::core::types::ContainerId;
///
/// let id = ContainerId::new("a1b2c3d4e5f6").unwrap();
/// assert_eq!(id.as_str(), "a1b2c3d4e5f6");
///
/// assert!(ContainerId::new("").is_err());
/// assert!(ContainerId::new("id with space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContainerId(String);

impl ContainerId {
    /// Create a new validated container id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidContainerId` for empty ids or ids with
    /// characters unsafe for record file names.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.is_empty() {
            return Err(TypeError::InvalidContainerId("id cannot be empty".into()));
        }
        for c in id.chars() {
            if !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.') {
                return Err(TypeError::InvalidContainerId(format!(
                    "id cannot contain '{c}'"
                )));
            }
        }
        Ok(Self(id))
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get an abbreviated form of the id for log lines.
    ///
    /// # Example
    ///
    /// ```
    /// use gantry::core::types::ContainerId;
    ///
    /// let id = ContainerId::new("a1b2c3d4e5f6a7b8").unwrap();
    /// assert_eq!(id.short(12), "a1b2c3d4e5f6");
    /// ```
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }
}

impl TryFrom<String> for ContainerId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ContainerId> for String {
    fn from(id: ContainerId) -> Self {
        id.0
    }
}

impl AsRef<str> for ContainerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An absolute path inside a container where a lib or asset lands.
///
/// Mount points must be absolute and normalized:
/// - Must start with `/`
/// - Cannot contain `..` components or empty components (`//`)
/// - Cannot be `/` itself (mounting over the container root is never intended)
///
/// # Example
///
/// ```
/// use gantry::core::types::MountPoint;
///
/// let mount = MountPoint::new("/libs/auth").unwrap();
/// assert_eq!(mount.as_str(), "/libs/auth");
///
/// assert!(MountPoint::new("libs/auth").is_err());
/// assert!(MountPoint::new("/libs/../etc").is_err());
/// assert!(MountPoint::new("/").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MountPoint(String);

impl MountPoint {
    /// Create a new validated mount point.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidMountPoint` if the path is not an
    /// absolute, normalized container path.
    pub fn new(path: impl Into<String>) -> Result<Self, TypeError> {
        let path = path.into();
        Self::validate(&path)?;
        Ok(Self(path))
    }

    fn validate(path: &str) -> Result<(), TypeError> {
        if !path.starts_with('/') {
            return Err(TypeError::InvalidMountPoint(
                "mount point must be absolute".into(),
            ));
        }
        if path == "/" {
            return Err(TypeError::InvalidMountPoint(
                "mount point cannot be the container root".into(),
            ));
        }
        if path.contains("//") {
            return Err(TypeError::InvalidMountPoint(
                "mount point cannot contain '//'".into(),
            ));
        }
        for component in path.split('/').skip(1) {
            if component == ".." || component == "." {
                return Err(TypeError::InvalidMountPoint(
                    "mount point cannot contain '.' or '..' components".into(),
                ));
            }
        }
        for c in path.chars() {
            if c.is_ascii_control() {
                return Err(TypeError::InvalidMountPoint(
                    "mount point cannot contain control characters".into(),
                ));
            }
        }
        Ok(())
    }

    /// Get the mount point as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MountPoint {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<MountPoint> for String {
    fn from(path: MountPoint) -> Self {
        path.0
    }
}

impl AsRef<str> for MountPoint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MountPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A UTC timestamp in RFC3339 format.
///
/// # Example
///
/// ```
/// use gantry::core::types::UtcTimestamp;
///
/// let now = UtcTimestamp::now();
/// println!("Current time: {}", now);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Create a timestamp for the current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    /// Create a timestamp from a chrono DateTime.
    pub fn from_datetime(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Self(dt)
    }

    /// Get the underlying datetime.
    pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// A stable hash over an ordered install command set.
///
/// The fingerprint decides idempotent skip versus re-run: a lib whose
/// recorded fingerprint matches the planned one has its install step
/// skipped on re-entry. Computed as SHA-256 over the command strings with
/// a length-prefix per entry, so `["a b"]` and `["a", "b"]` hash
/// differently.
///
/// # Example
///
/// ```
/// use gantry::core::types::Fingerprint;
///
/// let commands = vec!["make".to_string(), "make install".to_string()];
/// let fp = Fingerprint::of_commands(&commands);
///
/// // Deterministic
/// assert_eq!(fp, Fingerprint::of_commands(&commands));
///
/// // Order matters
/// let reversed = vec!["make install".to_string(), "make".to_string()];
/// assert_ne!(fp, Fingerprint::of_commands(&reversed));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of an ordered command list.
    pub fn of_commands<S: AsRef<str>>(commands: &[S]) -> Self {
        let mut hasher = Sha256::new();
        for command in commands {
            let bytes = command.as_ref().as_bytes();
            hasher.update((bytes.len() as u64).to_be_bytes());
            hasher.update(bytes);
        }
        Self(format!("sha256:{}", hex::encode(hasher.finalize())))
    }

    /// Get the fingerprint as a string slice (`sha256:`-prefixed hex).
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
