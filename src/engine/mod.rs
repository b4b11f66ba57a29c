//! engine
//!
//! Orchestrates the provisioning lifecycle: Resolve -> Plan -> Execute.
//!
//! # Architecture
//!
//! The engine is the central coordinator for container provisioning. It
//! enforces the two-stage model:
//!
//! 1. **Resolve/Plan**: Build the dependency graph, resolve assets, and
//!    produce a deterministic [`plan::ProvisioningPlan`]. Pure reads; any
//!    precondition failure (cycle, unknown reference, missing required
//!    asset) surfaces here with no side effects performed.
//! 2. **Execute**: Carry the plan out against one container through the
//!    [`exec::ExecutionEngine`] state machine:
//!    `Created -> Syncing -> Mounting -> Installing -> Ready`, with
//!    `Failed` reachable from every non-terminal phase.
//!
//! A container restart is simply resolve + execute again: the per-
//! container [`record::InstallExecutionRecord`] makes re-entry
//! idempotent.
//!
//! # Invariants
//!
//! - No mutation before planning succeeds
//! - A lib's mount is visible before its dependents' installs run
//! - A lib's installs complete before any dependent lib's installs start
//! - App `once`/`always` commands run strictly after all lib installs
//!   succeed

pub mod exec;
pub mod plan;
pub mod planner;
pub mod record;

// Re-exports for convenience
pub use exec::{ContainerPhase, ExecuteError, ExecuteResult, ExecutionEngine};
pub use plan::{PlanStep, ProvisioningPlan, RunId};
pub use planner::{PlanError, ProvisioningPlanner};
pub use record::{InstallExecutionRecord, RecordError, RecordStore};

use std::sync::Arc;

use crate::assets::{AssetResolver, AssetStore};
use crate::core::config::Config;
use crate::core::spec::{AppSpec, SpecSet};
use crate::core::types::ContainerId;
use crate::repo::state::RepoState;
use crate::repo::syncer::RepoSyncer;
use crate::runtime::ContainerRuntime;
use crate::vcs::VcsClient;

/// The provisioning engine facade.
///
/// Wires the planner and executor over one set of collaborators and the
/// known spec universe.
///
/// # Example
///
/// ```ignore
/// use gantry::engine::Provisioner;
///
/// let provisioner = Provisioner::new(universe, vcs, store, runtime, &config);
/// let plan = provisioner.resolve(&app)?;
/// match provisioner.execute(&container, &plan).await {
///     ExecuteResult::Ready { .. } => println!("up"),
///     ExecuteResult::Failed { error, failing_lib, .. } => {
///         eprintln!("failed on {failing_lib:?}: {error}");
///     }
/// }
/// ```
pub struct Provisioner {
    universe: SpecSet,
    planner: ProvisioningPlanner,
    engine: ExecutionEngine,
    syncer: Arc<RepoSyncer>,
}

impl std::fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioner")
            .field("libs", &self.universe.len())
            .finish_non_exhaustive()
    }
}

impl Provisioner {
    /// Create a provisioner over the spec universe and collaborators.
    pub fn new(
        universe: SpecSet,
        vcs: Arc<dyn VcsClient>,
        assets: Arc<dyn AssetStore>,
        runtime: Arc<dyn ContainerRuntime>,
        config: &Config,
    ) -> Self {
        let paths = config.paths();
        let syncer = Arc::new(RepoSyncer::new(vcs, paths.clone()));
        let planner = ProvisioningPlanner::new(paths.clone(), AssetResolver::new(assets));
        let engine = ExecutionEngine::new(
            Arc::clone(&syncer),
            runtime,
            RecordStore::new(paths),
            config.sync_jobs(),
        );
        Self {
            universe,
            planner,
            engine,
            syncer,
        }
    }

    /// Resolve an app into a provisioning plan.
    ///
    /// Pure reads; precondition failures surface here before any
    /// mutation.
    pub fn resolve(&self, app: &AppSpec) -> Result<ProvisioningPlan, PlanError> {
        self.planner.plan(app, &self.universe)
    }

    /// Execute a plan against a container.
    pub async fn execute(&self, container: &ContainerId, plan: &ProvisioningPlan) -> ExecuteResult {
        self.engine.execute(container, plan).await
    }

    /// Read-only view of all tracked repo states.
    pub fn repo_states(&self) -> Vec<RepoState> {
        self.syncer.states()
    }

    /// Drop repo state for libs no longer in any active spec.
    pub fn retain_active_libs(&self) {
        let active: Vec<_> = self.universe.iter().map(|s| s.name.clone()).collect();
        self.syncer.retain_active(&active);
    }

    /// Destroy a container's idempotency record.
    pub fn forget_container(&self, container: &ContainerId) -> Result<(), RecordError> {
        self.engine.forget_container(container)
    }

    /// The known spec universe.
    pub fn universe(&self) -> &SpecSet {
        &self.universe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssetStore;
    use crate::core::config::GlobalConfig;
    use crate::core::spec::{LibSpec, RepoTarget};
    use crate::core::types::{LibName, MountPoint};
    use crate::runtime::MockRuntime;
    use crate::vcs::MockVcs;

    fn lib(n: &str, depends: &[&str]) -> LibSpec {
        LibSpec {
            name: LibName::new(n).unwrap(),
            repo: RepoTarget::new(format!("{n}-loc")),
            mount: MountPoint::new(format!("/libs/{n}")).unwrap(),
            assets: vec![],
            install: vec![format!("install {n}")],
            depends: depends.iter().map(|d| LibName::new(*d).unwrap()).collect(),
            test: None,
        }
    }

    fn provisioner(
        universe: SpecSet,
        state_root: &std::path::Path,
    ) -> (MockVcs, MockRuntime, Provisioner) {
        let vcs = MockVcs::new();
        for spec in universe.iter() {
            vcs.set_remote_branch(&spec.repo.locator, "master", "abc123");
        }
        let runtime = MockRuntime::new();
        let config = Config {
            global: GlobalConfig {
                state_root: Some(state_root.to_path_buf()),
                ..Default::default()
            },
            project: None,
        };
        let p = Provisioner::new(
            universe,
            Arc::new(vcs.clone()),
            Arc::new(MemoryAssetStore::new()),
            Arc::new(runtime.clone()),
            &config,
        );
        (vcs, runtime, p)
    }

    #[tokio::test]
    async fn resolve_then_execute_reaches_ready() {
        let tmp = tempfile::tempdir().unwrap();
        let universe = SpecSet::from_specs(vec![lib("x", &[]), lib("y", &["x"])]).unwrap();
        let (_vcs, runtime, provisioner) = provisioner(universe, tmp.path());

        let app = AppSpec {
            name: LibName::new("web").unwrap(),
            libs: vec![LibName::new("y").unwrap()],
            once: vec![],
            always: vec!["run web".to_string()],
        };

        let plan = provisioner.resolve(&app).unwrap();
        let container = ContainerId::new("c1").unwrap();
        let result = provisioner.execute(&container, &plan).await;
        assert!(result.is_ready());

        assert_eq!(
            runtime.executed_commands(),
            vec!["install x", "install y", "run web"]
        );
        // Both repos tracked after the run.
        assert_eq!(provisioner.repo_states().len(), 2);
    }

    #[tokio::test]
    async fn resolve_rejects_unknown_reference() {
        let tmp = tempfile::tempdir().unwrap();
        let (_vcs, _runtime, provisioner) = provisioner(SpecSet::new(), tmp.path());

        let app = AppSpec {
            name: LibName::new("web").unwrap(),
            libs: vec![LibName::new("ghost").unwrap()],
            once: vec![],
            always: vec![],
        };
        assert!(matches!(
            provisioner.resolve(&app),
            Err(PlanError::Graph(_))
        ));
    }
}
