//! engine::planner
//!
//! Combines graph ordering with repo and asset state into an executable
//! plan.
//!
//! # Architecture
//!
//! For each lib in topological order the planner emits: a sync step, a
//! mount step binding the synced source to the lib's mount point,
//! placement steps for each resolvable asset, and an install step
//! carrying the lib's ordered commands. App-level `once`/`always` steps
//! come last.
//!
//! # Invariants
//!
//! - Plan construction performs no side effects beyond read-only queries
//! - Fail fast: a missing required asset for any active lib aborts
//!   construction before any mutation begins, so no partial provisioning
//!   is ever attempted against an unsatisfiable precondition
//! - Optional assets that are unregistered simply produce no placement
//!   step

use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use super::plan::{PlanStep, ProvisioningPlan, RunId};
use crate::assets::{AssetError, AssetResolver, AssetStoreError, ResolvedAsset};
use crate::core::graph::{DependencyGraph, GraphError};
use crate::core::paths::GantryPaths;
use crate::core::spec::{AppSpec, SpecSet};
use crate::core::types::LibName;

/// Errors from plan construction.
///
/// These are precondition failures: surfaced immediately, with no
/// partial side effects performed.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Graph construction failed (cycle or unknown reference).
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A `required=true` asset is unregistered for an active lib.
    #[error("lib '{lib}': missing required asset '{name}'")]
    MissingRequiredAsset {
        /// The lib declaring the asset.
        lib: LibName,
        /// The unregistered asset name.
        name: String,
    },

    /// The asset store failed during resolution.
    #[error("lib '{lib}': asset store failure: {source}")]
    AssetStore {
        /// The lib whose resolution failed.
        lib: LibName,
        /// The underlying store error.
        #[source]
        source: AssetStoreError,
    },
}

/// The ProvisioningPlanner.
#[derive(Debug, Clone)]
pub struct ProvisioningPlanner {
    paths: GantryPaths,
    resolver: AssetResolver,
}

impl ProvisioningPlanner {
    /// Create a planner over the storage layout and asset resolver.
    pub fn new(paths: GantryPaths, resolver: AssetResolver) -> Self {
        Self { paths, resolver }
    }

    /// Build the provisioning plan for an app.
    ///
    /// # Errors
    ///
    /// - [`PlanError::Graph`] for cycles and unknown references
    /// - [`PlanError::MissingRequiredAsset`] if any active lib declares a
    ///   required asset that is not registered
    pub fn plan(&self, app: &AppSpec, universe: &SpecSet) -> Result<ProvisioningPlan, PlanError> {
        let graph = DependencyGraph::resolve(app, universe)?;

        // Resolve every active lib's assets up front; any missing
        // required asset aborts before a single step is emitted.
        let mut resolved: Vec<(LibName, Vec<ResolvedAsset>)> = Vec::with_capacity(graph.len());
        for lib in graph.order() {
            let spec = universe
                .get(lib)
                .expect("active libs are drawn from the universe");
            let assets = self
                .resolver
                .resolve_all(&spec.assets)
                .map_err(|e| match e {
                    AssetError::MissingRequiredAsset { name } => PlanError::MissingRequiredAsset {
                        lib: lib.clone(),
                        name,
                    },
                    AssetError::Store(source) => PlanError::AssetStore {
                        lib: lib.clone(),
                        source,
                    },
                })?;
            resolved.push((lib.clone(), assets));
        }

        let mut plan = ProvisioningPlan::new(RunId::new(), app.name.clone());
        for (lib, assets) in resolved {
            let spec = universe
                .get(&lib)
                .expect("active libs are drawn from the universe");

            let host_path = if spec.repo.is_local() {
                PathBuf::from(&spec.repo.locator)
            } else {
                self.paths.repo_path(&lib)
            };

            plan = plan
                .with_step(PlanStep::SyncRepo {
                    lib: lib.clone(),
                    target: spec.repo.clone(),
                })
                .with_step(PlanStep::Mount {
                    lib: lib.clone(),
                    host_path,
                    mount: spec.mount.clone(),
                });

            for asset in assets {
                if let ResolvedAsset::Present {
                    declaration,
                    contents,
                } = asset
                {
                    plan = plan.with_step(PlanStep::PlaceAsset {
                        lib: lib.clone(),
                        name: declaration.name,
                        target: declaration.target,
                        contents,
                    });
                }
            }

            plan = plan.with_step(PlanStep::Install {
                lib: lib.clone(),
                commands: spec.install.clone(),
                depends_on: graph.dependencies_of(&lib).to_vec(),
            });
        }

        if !app.once.is_empty() {
            plan = plan.with_step(PlanStep::AppOnce {
                app: app.name.clone(),
                commands: app.once.clone(),
            });
        }
        if !app.always.is_empty() {
            plan = plan.with_step(PlanStep::AppAlways {
                app: app.name.clone(),
                commands: app.always.clone(),
            });
        }

        debug!(app = %app.name, steps = plan.step_count(), digest = %plan.digest(), "plan built");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssetStore;
    use crate::core::spec::{AssetDeclaration, LibSpec, RepoTarget};
    use crate::core::types::MountPoint;
    use std::sync::Arc;

    fn name(s: &str) -> LibName {
        LibName::new(s).unwrap()
    }

    fn lib(n: &str, depends: &[&str]) -> LibSpec {
        LibSpec {
            name: name(n),
            repo: RepoTarget::new(format!("git@example.com:org/{n}.git")),
            mount: MountPoint::new(format!("/libs/{n}")).unwrap(),
            assets: vec![],
            install: vec![format!("install {n}")],
            depends: depends.iter().map(|d| name(d)).collect(),
            test: None,
        }
    }

    fn app(libs: &[&str]) -> AppSpec {
        AppSpec {
            name: name("web"),
            libs: libs.iter().map(|l| name(l)).collect(),
            once: vec!["./setup".to_string()],
            always: vec!["./run".to_string()],
        }
    }

    fn planner_with(store: MemoryAssetStore) -> ProvisioningPlanner {
        ProvisioningPlanner::new(
            GantryPaths::new(PathBuf::from("/var/lib/gantry")),
            AssetResolver::new(Arc::new(store)),
        )
    }

    #[test]
    fn steps_follow_dependency_order() {
        // web -> {x, y}; y -> x
        let universe = SpecSet::from_specs(vec![lib("x", &[]), lib("y", &["x"])]).unwrap();
        let planner = planner_with(MemoryAssetStore::new());

        let plan = planner.plan(&app(&["x", "y"]), &universe).unwrap();

        let installs: Vec<&str> = plan
            .install_steps()
            .map(|s| s.owner().as_str())
            .collect();
        assert_eq!(installs, vec!["x", "y"]);

        // App steps come last.
        let last_two: Vec<&PlanStep> = plan.steps.iter().rev().take(2).collect();
        assert!(matches!(last_two[0], PlanStep::AppAlways { .. }));
        assert!(matches!(last_two[1], PlanStep::AppOnce { .. }));
    }

    #[test]
    fn per_lib_step_shape() {
        let mut spec = lib("x", &[]);
        spec.assets = vec![AssetDeclaration::required(
            "cert",
            MountPoint::new("/etc/cert.pem").unwrap(),
        )];
        let universe = SpecSet::from_specs(vec![spec]).unwrap();

        let store = MemoryAssetStore::new();
        store.set("cert", b"pem");
        let planner = planner_with(store);

        let plan = planner.plan(&app(&["x"]), &universe).unwrap();

        // Sync, mount, place, install for x; then once, always for the app.
        assert!(matches!(plan.steps[0], PlanStep::SyncRepo { .. }));
        assert!(matches!(plan.steps[1], PlanStep::Mount { .. }));
        assert!(matches!(plan.steps[2], PlanStep::PlaceAsset { .. }));
        assert!(matches!(plan.steps[3], PlanStep::Install { .. }));
        assert_eq!(plan.step_count(), 6);
    }

    #[test]
    fn mount_source_is_managed_cache_for_remote_targets() {
        let universe = SpecSet::from_specs(vec![lib("x", &[])]).unwrap();
        let planner = planner_with(MemoryAssetStore::new());

        let plan = planner.plan(&app(&["x"]), &universe).unwrap();
        match &plan.steps[1] {
            PlanStep::Mount { host_path, .. } => {
                assert_eq!(host_path, &PathBuf::from("/var/lib/gantry/repos/x"));
            }
            other => panic!("expected mount, got {other:?}"),
        }
    }

    #[test]
    fn mount_source_is_in_place_for_local_targets() {
        let mut spec = lib("x", &[]);
        spec.repo = RepoTarget::new("/home/dev/x");
        let universe = SpecSet::from_specs(vec![spec]).unwrap();
        let planner = planner_with(MemoryAssetStore::new());

        let plan = planner.plan(&app(&["x"]), &universe).unwrap();
        match &plan.steps[1] {
            PlanStep::Mount { host_path, .. } => {
                assert_eq!(host_path, &PathBuf::from("/home/dev/x"));
            }
            other => panic!("expected mount, got {other:?}"),
        }
    }

    #[test]
    fn missing_required_asset_fails_before_any_step() {
        let mut spec = lib("x", &[]);
        spec.assets = vec![AssetDeclaration::required(
            "ghost",
            MountPoint::new("/etc/ghost").unwrap(),
        )];
        let universe = SpecSet::from_specs(vec![spec]).unwrap();
        let planner = planner_with(MemoryAssetStore::new());

        let err = planner.plan(&app(&["x"]), &universe).unwrap_err();
        match err {
            PlanError::MissingRequiredAsset { lib, name } => {
                assert_eq!(lib.as_str(), "x");
                assert_eq!(name, "ghost");
            }
            other => panic!("expected missing asset, got {other:?}"),
        }
    }

    #[test]
    fn missing_required_asset_deep_in_order_still_aborts_whole_plan() {
        // x is fine; y (later in order) has the missing asset. Nothing
        // is emitted for either.
        let mut y = lib("y", &["x"]);
        y.assets = vec![AssetDeclaration::required(
            "ghost",
            MountPoint::new("/etc/ghost").unwrap(),
        )];
        let universe = SpecSet::from_specs(vec![lib("x", &[]), y]).unwrap();
        let planner = planner_with(MemoryAssetStore::new());

        assert!(matches!(
            planner.plan(&app(&["y"]), &universe),
            Err(PlanError::MissingRequiredAsset { .. })
        ));
    }

    #[test]
    fn absent_optional_asset_is_skipped_silently() {
        let mut spec = lib("x", &[]);
        spec.assets = vec![AssetDeclaration::optional(
            "netrc",
            MountPoint::new("/root/.netrc").unwrap(),
        )];
        let universe = SpecSet::from_specs(vec![spec]).unwrap();
        let planner = planner_with(MemoryAssetStore::new());

        let plan = planner.plan(&app(&["x"]), &universe).unwrap();
        assert!(!plan
            .steps
            .iter()
            .any(|s| matches!(s, PlanStep::PlaceAsset { .. })));
    }

    #[test]
    fn graph_errors_propagate() {
        let universe = SpecSet::from_specs(vec![lib("a", &["b"]), lib("b", &["a"])]).unwrap();
        let planner = planner_with(MemoryAssetStore::new());

        assert!(matches!(
            planner.plan(&app(&["a"]), &universe),
            Err(PlanError::Graph(GraphError::CyclicDependency { .. }))
        ));
    }

    #[test]
    fn install_steps_carry_dependency_edges() {
        let universe = SpecSet::from_specs(vec![lib("x", &[]), lib("y", &["x"])]).unwrap();
        let planner = planner_with(MemoryAssetStore::new());

        let plan = planner.plan(&app(&["y"]), &universe).unwrap();
        let y_install = plan
            .install_steps()
            .find(|s| s.owner().as_str() == "y")
            .unwrap();
        match y_install {
            PlanStep::Install { depends_on, .. } => {
                assert_eq!(depends_on, &vec![name("x")]);
            }
            other => panic!("expected install, got {other:?}"),
        }
    }

    #[test]
    fn plan_content_is_deterministic() {
        let universe = SpecSet::from_specs(vec![
            lib("a", &[]),
            lib("b", &["a"]),
            lib("c", &["a"]),
        ])
        .unwrap();
        let planner = planner_with(MemoryAssetStore::new());

        let plan1 = planner.plan(&app(&["b", "c"]), &universe).unwrap();
        let plan2 = planner.plan(&app(&["b", "c"]), &universe).unwrap();
        // Run ids differ; content digests match.
        assert_eq!(plan1.digest(), plan2.digest());
    }

    #[test]
    fn app_without_commands_gets_no_app_steps() {
        let universe = SpecSet::from_specs(vec![lib("x", &[])]).unwrap();
        let planner = planner_with(MemoryAssetStore::new());
        let app = AppSpec {
            name: name("web"),
            libs: vec![name("x")],
            once: vec![],
            always: vec![],
        };

        let plan = planner.plan(&app, &universe).unwrap();
        assert!(!plan
            .steps
            .iter()
            .any(|s| matches!(s, PlanStep::AppOnce { .. } | PlanStep::AppAlways { .. })));
    }
}
