//! engine::plan
//!
//! Deterministic provisioning plan generation.
//!
//! # Architecture
//!
//! Plans are the sole intermediate representation between resolved spec
//! state and container mutation.
//!
//! Plans are:
//! - **Deterministic**: Same specs and registration state always produce
//!   the same plan
//! - **Previewable**: Can be shown to the operator before execution
//! - **Typed**: Steps are strongly typed with explicit per-lib ownership
//!
//! # Invariants
//!
//! - The planner does not mutate any state; plan construction performs
//!   read-only queries only
//! - Steps appear in dependency order: a lib's steps precede its
//!   dependents' steps, and app-level steps come last
//! - A plan is consumed by one execution and not persisted
//!
//! # Example
//!
//! ```
//! use gantry::engine::plan::{PlanStep, ProvisioningPlan, RunId};
//! use gantry::core::types::LibName;
//!
//! let plan = ProvisioningPlan::new(RunId::new(), LibName::new("web").unwrap())
//!     .with_step(PlanStep::AppAlways {
//!         app: LibName::new("web").unwrap(),
//!         commands: vec!["./manage.py runserver".to_string()],
//!     });
//!
//! assert!(!plan.is_empty());
//! assert_eq!(plan.step_count(), 1);
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::spec::RepoTarget;
use crate::core::types::{Fingerprint, LibName, MountPoint};

/// Provisioning run identifier for log correlation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Create a fresh run id.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Create a run id from a fixed string (tests, replay).
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A typed plan step.
///
/// Each step names the lib (or app) it belongs to, so execution can
/// contain failures along dependency edges.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanStep {
    /// Reconcile a lib's local repo copy with its declared target.
    SyncRepo {
        /// The lib to sync.
        lib: LibName,
        /// The declared target.
        target: RepoTarget,
    },

    /// Bind the synced source into the container.
    Mount {
        /// The lib being mounted.
        lib: LibName,
        /// Host-side source (managed checkout or in-place local repo).
        host_path: PathBuf,
        /// Container-side mount point.
        mount: MountPoint,
    },

    /// Place a resolved asset's contents into the container.
    PlaceAsset {
        /// The lib declaring the asset.
        lib: LibName,
        /// Registration name.
        name: String,
        /// Container-side target path.
        target: MountPoint,
        /// Registered contents.
        contents: Vec<u8>,
    },

    /// Run a lib's install commands, in order.
    Install {
        /// The lib being installed.
        lib: LibName,
        /// Ordered install commands.
        commands: Vec<String>,
        /// Direct dependencies whose installs must complete first.
        depends_on: Vec<LibName>,
    },

    /// Run the app's `once` commands (first successful creation only).
    AppOnce {
        /// The app.
        app: LibName,
        /// Ordered commands.
        commands: Vec<String>,
    },

    /// Run the app's `always` commands (every start).
    AppAlways {
        /// The app.
        app: LibName,
        /// Ordered commands.
        commands: Vec<String>,
    },
}

impl PlanStep {
    /// The lib or app this step belongs to.
    pub fn owner(&self) -> &LibName {
        match self {
            PlanStep::SyncRepo { lib, .. }
            | PlanStep::Mount { lib, .. }
            | PlanStep::PlaceAsset { lib, .. }
            | PlanStep::Install { lib, .. } => lib,
            PlanStep::AppOnce { app, .. } | PlanStep::AppAlways { app, .. } => app,
        }
    }

    /// The fingerprint of this step's command list, for install and app
    /// steps.
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        match self {
            PlanStep::Install { commands, .. }
            | PlanStep::AppOnce { commands, .. }
            | PlanStep::AppAlways { commands, .. } => Some(Fingerprint::of_commands(commands)),
            _ => None,
        }
    }

    /// Get a human-readable description of this step.
    pub fn description(&self) -> String {
        match self {
            PlanStep::SyncRepo { lib, target } => {
                format!("Sync {} from {} ({})", lib, target.locator, target.branch)
            }
            PlanStep::Mount {
                lib,
                host_path,
                mount,
            } => {
                format!("Mount {} -> {} for {}", host_path.display(), mount, lib)
            }
            PlanStep::PlaceAsset {
                lib, name, target, ..
            } => {
                format!("Place asset '{}' at {} for {}", name, target, lib)
            }
            PlanStep::Install { lib, commands, .. } => {
                format!("Install {} ({} commands)", lib, commands.len())
            }
            PlanStep::AppOnce { app, commands } => {
                format!("Run {} once-commands for {}", commands.len(), app)
            }
            PlanStep::AppAlways { app, commands } => {
                format!("Run {} always-commands for {}", commands.len(), app)
            }
        }
    }
}

/// A complete provisioning plan for one container lifecycle event.
///
/// Contains all information the execution engine needs. Plans are
/// immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningPlan {
    /// Run ID for log correlation.
    pub run_id: RunId,
    /// The app this plan provisions.
    pub app: LibName,
    /// Ordered steps to execute.
    pub steps: Vec<PlanStep>,
}

impl ProvisioningPlan {
    /// Create a new empty plan.
    pub fn new(run_id: RunId, app: LibName) -> Self {
        Self {
            run_id,
            app,
            steps: vec![],
        }
    }

    /// Add a step to the plan (builder pattern).
    pub fn with_step(mut self, step: PlanStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Add multiple steps.
    pub fn with_steps(mut self, steps: impl IntoIterator<Item = PlanStep>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Compute a digest of the plan for log correlation.
    ///
    /// SHA-256 over the canonical JSON serialization of the app and
    /// steps; the run id is excluded so identical content yields an
    /// identical digest across runs.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.app.as_str().as_bytes());
        let json = serde_json::to_string(&self.steps).unwrap_or_default();
        hasher.update(json.as_bytes());
        format!("sha256:{}", hex::encode(hasher.finalize()))
    }

    /// Check if the plan is empty (no-op).
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Get the number of steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Iterate the sync steps.
    pub fn sync_steps(&self) -> impl Iterator<Item = &PlanStep> {
        self.steps
            .iter()
            .filter(|s| matches!(s, PlanStep::SyncRepo { .. }))
    }

    /// Iterate the install steps, in dependency order.
    pub fn install_steps(&self) -> impl Iterator<Item = &PlanStep> {
        self.steps
            .iter()
            .filter(|s| matches!(s, PlanStep::Install { .. }))
    }

    /// The libs this plan touches, in provisioning order.
    pub fn libs(&self) -> Vec<&LibName> {
        self.steps
            .iter()
            .filter_map(|s| match s {
                PlanStep::SyncRepo { lib, .. } => Some(lib),
                _ => None,
            })
            .collect()
    }

    /// Generate a preview string for operator confirmation.
    pub fn preview(&self) -> String {
        if self.is_empty() {
            return format!("{}: No provisioning needed", self.app);
        }

        let mut lines = vec![format!("{}:", self.app)];
        for (i, step) in self.steps.iter().enumerate() {
            lines.push(format!("  {}. {}", i + 1, step.description()));
        }
        lines.join("\n")
    }
}

impl PartialEq for ProvisioningPlan {
    fn eq(&self, other: &Self) -> bool {
        self.run_id == other.run_id && self.app == other.app && self.steps == other.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> LibName {
        LibName::new(s).unwrap()
    }

    fn mount(s: &str) -> MountPoint {
        MountPoint::new(s).unwrap()
    }

    mod plan_step {
        use super::*;

        #[test]
        fn owner_names_the_lib() {
            let step = PlanStep::Install {
                lib: name("auth"),
                commands: vec!["make".to_string()],
                depends_on: vec![],
            };
            assert_eq!(step.owner().as_str(), "auth");
        }

        #[test]
        fn fingerprint_only_for_command_steps() {
            let install = PlanStep::Install {
                lib: name("auth"),
                commands: vec!["make".to_string()],
                depends_on: vec![],
            };
            assert!(install.fingerprint().is_some());

            let sync = PlanStep::SyncRepo {
                lib: name("auth"),
                target: RepoTarget::new("/repos/auth"),
            };
            assert!(sync.fingerprint().is_none());
        }

        #[test]
        fn install_fingerprint_tracks_command_list() {
            let a = PlanStep::Install {
                lib: name("auth"),
                commands: vec!["make".to_string()],
                depends_on: vec![],
            };
            let b = PlanStep::Install {
                lib: name("auth"),
                commands: vec!["make".to_string(), "make install".to_string()],
                depends_on: vec![],
            };
            assert_ne!(a.fingerprint(), b.fingerprint());
        }

        #[test]
        fn descriptions_mention_the_owner() {
            let step = PlanStep::Mount {
                lib: name("auth"),
                host_path: PathBuf::from("/cache/auth"),
                mount: mount("/libs/auth"),
            };
            assert!(step.description().contains("auth"));
        }

        #[test]
        fn serialization_roundtrip() {
            let steps = vec![
                PlanStep::SyncRepo {
                    lib: name("a"),
                    target: RepoTarget::new("git@example.com:org/a.git"),
                },
                PlanStep::PlaceAsset {
                    lib: name("a"),
                    name: "cert".to_string(),
                    target: mount("/etc/cert.pem"),
                    contents: b"pem".to_vec(),
                },
                PlanStep::AppAlways {
                    app: name("web"),
                    commands: vec!["./run".to_string()],
                },
            ];

            for step in steps {
                let json = serde_json::to_string(&step).unwrap();
                let parsed: PlanStep = serde_json::from_str(&json).unwrap();
                assert_eq!(step, parsed);
            }
        }
    }

    mod plan {
        use super::*;

        #[test]
        fn new_is_empty() {
            let plan = ProvisioningPlan::new(RunId::new(), name("web"));
            assert!(plan.is_empty());
            assert_eq!(plan.step_count(), 0);
        }

        #[test]
        fn builder_appends_in_order() {
            let plan = ProvisioningPlan::new(RunId::new(), name("web"))
                .with_step(PlanStep::SyncRepo {
                    lib: name("a"),
                    target: RepoTarget::new("/repos/a"),
                })
                .with_step(PlanStep::Install {
                    lib: name("a"),
                    commands: vec![],
                    depends_on: vec![],
                });
            assert_eq!(plan.step_count(), 2);
            assert_eq!(plan.libs(), vec![&name("a")]);
        }

        #[test]
        fn digest_deterministic_across_run_ids() {
            let step = PlanStep::SyncRepo {
                lib: name("a"),
                target: RepoTarget::new("/repos/a"),
            };
            let plan1 = ProvisioningPlan::new(RunId::from_string("one"), name("web"))
                .with_step(step.clone());
            let plan2 =
                ProvisioningPlan::new(RunId::from_string("two"), name("web")).with_step(step);
            assert_eq!(plan1.digest(), plan2.digest());
        }

        #[test]
        fn digest_changes_with_content() {
            let plan1 = ProvisioningPlan::new(RunId::from_string("x"), name("web")).with_step(
                PlanStep::AppAlways {
                    app: name("web"),
                    commands: vec!["a".to_string()],
                },
            );
            let plan2 = ProvisioningPlan::new(RunId::from_string("x"), name("web")).with_step(
                PlanStep::AppAlways {
                    app: name("web"),
                    commands: vec!["b".to_string()],
                },
            );
            assert_ne!(plan1.digest(), plan2.digest());
        }

        #[test]
        fn digest_has_prefix() {
            let plan = ProvisioningPlan::new(RunId::new(), name("web"));
            assert!(plan.digest().starts_with("sha256:"));
        }

        #[test]
        fn preview_empty() {
            let plan = ProvisioningPlan::new(RunId::new(), name("web"));
            assert!(plan.preview().contains("No provisioning needed"));
        }

        #[test]
        fn preview_numbers_steps() {
            let plan = ProvisioningPlan::new(RunId::new(), name("web"))
                .with_step(PlanStep::SyncRepo {
                    lib: name("a"),
                    target: RepoTarget::new("/repos/a"),
                })
                .with_step(PlanStep::AppAlways {
                    app: name("web"),
                    commands: vec!["./run".to_string()],
                });

            let preview = plan.preview();
            assert!(preview.contains("1."));
            assert!(preview.contains("2."));
        }

        #[test]
        fn serialization_roundtrip() {
            let plan = ProvisioningPlan::new(RunId::from_string("id"), name("web")).with_step(
                PlanStep::Install {
                    lib: name("a"),
                    commands: vec!["make".to_string()],
                    depends_on: vec![name("b")],
                },
            );

            let json = serde_json::to_string(&plan).unwrap();
            let parsed: ProvisioningPlan = serde_json::from_str(&json).unwrap();
            assert_eq!(plan, parsed);
        }
    }
}
