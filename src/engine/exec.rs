//! engine::exec
//!
//! The execution engine: carries a provisioning plan out against a real
//! container.
//!
//! # Architecture
//!
//! Execution walks a per-container state machine:
//!
//! ```text
//! Created -> Syncing -> Mounting -> Installing -> Ready
//!                \          \           \
//!                 +----------+-----------+--> Failed
//! ```
//!
//! Phase ordering is strict: every sync step completes (in parallel,
//! failures isolated per lib) before any mount begins; mounts and asset
//! placements run in parallel per lib; install batches run in dependency
//! order, with independent branches of the graph concurrent.
//!
//! # Failure containment
//!
//! - A lib whose sync or mount failed is skipped, along with its
//!   transitive dependents; unrelated sibling subgraphs continue through
//!   their whole pipeline
//! - A lib install failure starts no new install steps anywhere;
//!   in-flight installs drain best-effort
//! - Completed sync/mount work is left in place; repo state and mounts
//!   are cheap to reconcile idempotently on retry
//! - App `once`/`always` commands run only when every lib install
//!   succeeded
//!
//! # Idempotent re-entry
//!
//! Before running a lib's install commands the engine compares the
//! command-list fingerprint against the container's
//! [`InstallExecutionRecord`]; a match skips the batch (log-only). The
//! record is updated after each successful batch, so an interrupted run
//! resumes exactly where it stopped.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::plan::{PlanStep, ProvisioningPlan, RunId};
use super::record::{InstallExecutionRecord, RecordError, RecordStore};
use crate::core::types::{ContainerId, Fingerprint, LibName, MountPoint};
use crate::repo::syncer::{RepoSyncer, SyncError};
use crate::runtime::{ContainerRuntime, RuntimeError};

/// Per-container provisioning phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerPhase {
    /// Plan accepted, nothing started.
    Created,
    /// Repo syncs in flight.
    Syncing,
    /// Mount bindings and asset placements in flight.
    Mounting,
    /// Install command batches in flight.
    Installing,
    /// All steps completed; terminal for this lifecycle event.
    Ready,
    /// Provisioning failed; terminal for this lifecycle event.
    Failed,
}

impl std::fmt::Display for ContainerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ContainerPhase::Created => "created",
            ContainerPhase::Syncing => "syncing",
            ContainerPhase::Mounting => "mounting",
            ContainerPhase::Installing => "installing",
            ContainerPhase::Ready => "ready",
            ContainerPhase::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Errors from plan execution.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// A lib's repo sync failed.
    #[error("sync failed: {source}")]
    Sync {
        /// The lib whose sync failed.
        lib: LibName,
        /// The underlying sync error.
        #[source]
        source: SyncError,
    },

    /// A lib's mount binding failed.
    #[error("lib '{lib}': mount failed: {source}")]
    Mount {
        /// The lib whose mount failed.
        lib: LibName,
        /// The underlying runtime error.
        #[source]
        source: RuntimeError,
    },

    /// Placing a lib's asset failed.
    #[error("lib '{lib}': placing asset '{asset}' failed: {source}")]
    PlaceAsset {
        /// The lib declaring the asset.
        lib: LibName,
        /// The asset name.
        asset: String,
        /// The underlying runtime error.
        #[source]
        source: RuntimeError,
    },

    /// An install command exited non-zero.
    #[error("lib '{lib}': install command '{command}' failed with exit code {exit_code}")]
    InstallCommand {
        /// The lib being installed.
        lib: LibName,
        /// The failing command.
        command: String,
        /// Its exit code.
        exit_code: i32,
    },

    /// An app-level command exited non-zero.
    #[error("app '{app}': command '{command}' failed with exit code {exit_code}")]
    AppCommand {
        /// The app.
        app: LibName,
        /// The failing command.
        command: String,
        /// Its exit code.
        exit_code: i32,
    },

    /// A command could not be executed at all.
    #[error("'{owner}': {source}")]
    Runtime {
        /// The lib or app the command belonged to.
        owner: LibName,
        /// The underlying runtime error.
        #[source]
        source: RuntimeError,
    },

    /// The install record could not be loaded or persisted.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Internal engine error (task join failure).
    #[error("internal: {0}")]
    Internal(String),
}

impl ExecuteError {
    /// The lib this failure originated from, when it was lib-scoped.
    pub fn failing_lib(&self) -> Option<&LibName> {
        match self {
            ExecuteError::Sync { lib, .. }
            | ExecuteError::Mount { lib, .. }
            | ExecuteError::PlaceAsset { lib, .. }
            | ExecuteError::InstallCommand { lib, .. }
            | ExecuteError::Runtime { owner: lib, .. } => Some(lib),
            _ => None,
        }
    }
}

/// Result of executing a plan.
#[derive(Debug)]
pub enum ExecuteResult {
    /// Every step completed; the container is provisioned.
    Ready {
        /// The run that completed.
        run_id: RunId,
    },
    /// Provisioning failed.
    Failed {
        /// The first error encountered, in plan order.
        error: ExecuteError,
        /// The lib the error originated from, when lib-scoped.
        failing_lib: Option<LibName>,
        /// The phase the failure occurred in.
        phase: ContainerPhase,
    },
}

impl ExecuteResult {
    /// Whether the container reached Ready.
    pub fn is_ready(&self) -> bool {
        matches!(self, ExecuteResult::Ready { .. })
    }
}

/// One lib's install work, extracted from the plan.
#[derive(Debug, Clone)]
struct InstallBatch {
    lib: LibName,
    commands: Vec<String>,
    depends_on: Vec<LibName>,
    fingerprint: Fingerprint,
}

/// One lib's mount work, extracted from the plan.
#[derive(Debug, Clone)]
struct MountBatch {
    lib: LibName,
    host_path: PathBuf,
    mount: MountPoint,
    assets: Vec<(String, MountPoint, Vec<u8>)>,
}

/// The execution engine.
///
/// One engine serves many containers; the per-container record keeps
/// their idempotency state independent.
pub struct ExecutionEngine {
    syncer: Arc<RepoSyncer>,
    runtime: Arc<dyn ContainerRuntime>,
    records: RecordStore,
    sync_jobs: usize,
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("sync_jobs", &self.sync_jobs)
            .finish_non_exhaustive()
    }
}

impl ExecutionEngine {
    /// Create an engine over the collaborators.
    pub fn new(
        syncer: Arc<RepoSyncer>,
        runtime: Arc<dyn ContainerRuntime>,
        records: RecordStore,
        sync_jobs: usize,
    ) -> Self {
        Self {
            syncer,
            runtime,
            records,
            sync_jobs: sync_jobs.max(1),
        }
    }

    /// Execute a plan against a container.
    ///
    /// Failures are reported in the result, never panicked; the engine
    /// is always safe to call again with a fresh plan (idempotent
    /// re-entry).
    pub async fn execute(&self, container: &ContainerId, plan: &ProvisioningPlan) -> ExecuteResult {
        info!(
            container = %container.short(12),
            run = %plan.run_id,
            digest = %plan.digest(),
            "provisioning"
        );

        let mut record = match self.records.load(container) {
            Ok(record) => record,
            Err(e) => {
                return ExecuteResult::Failed {
                    error: e.into(),
                    failing_lib: None,
                    phase: ContainerPhase::Created,
                }
            }
        };

        let lib_order: Vec<LibName> = plan.libs().into_iter().cloned().collect();
        let installs = Self::install_batches(plan);
        let mounts = Self::mount_batches(plan);

        // ---- Syncing ----
        let sync_failures = self.run_sync_phase(plan).await;
        let mut poisoned = Self::poison(&lib_order, &installs, sync_failures.keys());
        let mut first_error: Option<(ExecuteError, ContainerPhase)> = Self::first_by_order(
            &lib_order,
            sync_failures
                .into_iter()
                .map(|(lib, source)| (lib.clone(), ExecuteError::Sync { lib, source })),
        )
        .map(|error| (error, ContainerPhase::Syncing));

        // ---- Mounting ----
        let mount_failures = self.run_mount_phase(container, mounts, &poisoned).await;
        let mount_failed_libs: Vec<LibName> =
            mount_failures.iter().map(|(lib, _)| lib.clone()).collect();
        if first_error.is_none() {
            first_error = Self::first_by_order(&lib_order, mount_failures)
                .map(|error| (error, ContainerPhase::Mounting));
        }
        if !mount_failed_libs.is_empty() {
            poisoned.extend(Self::poison(&lib_order, &installs, mount_failed_libs.iter()));
        }

        // ---- Installing ----
        let install_result = self
            .run_install_phase(container, &mut record, &lib_order, installs, &poisoned)
            .await;
        if let Err(error) = install_result {
            if first_error.is_none() {
                first_error = Some((error, ContainerPhase::Installing));
            }
        }

        if let Some((error, phase)) = first_error {
            let failing_lib = error.failing_lib().cloned();
            warn!(container = %container.short(12), %error, %phase, "provisioning failed");
            return ExecuteResult::Failed {
                error,
                failing_lib,
                phase,
            };
        }

        // ---- App commands, after all lib installs succeed ----
        if let Err(error) = self.run_app_phase(container, &mut record, plan).await {
            let failing_lib = error.failing_lib().cloned();
            warn!(container = %container.short(12), %error, "app startup failed");
            return ExecuteResult::Failed {
                error,
                failing_lib,
                phase: ContainerPhase::Installing,
            };
        }

        info!(container = %container.short(12), run = %plan.run_id, "ready");
        ExecuteResult::Ready {
            run_id: plan.run_id.clone(),
        }
    }

    /// Destroy a container's idempotency record (the container itself is
    /// gone).
    pub fn forget_container(&self, container: &ContainerId) -> Result<(), RecordError> {
        self.records.delete(container)
    }

    // =========================================================================
    // Phases
    // =========================================================================

    /// Run all sync steps in parallel, bounded by `sync_jobs`.
    ///
    /// Failures are collected per lib; siblings are unaffected.
    async fn run_sync_phase(&self, plan: &ProvisioningPlan) -> HashMap<LibName, SyncError> {
        let semaphore = Arc::new(Semaphore::new(self.sync_jobs));
        let mut join: JoinSet<(LibName, Result<(), SyncError>)> = JoinSet::new();

        for step in plan.sync_steps() {
            if let PlanStep::SyncRepo { lib, target } = step {
                let lib = lib.clone();
                let target = target.clone();
                let syncer = Arc::clone(&self.syncer);
                let semaphore = Arc::clone(&semaphore);
                join.spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .expect("sync semaphore is never closed");
                    let result = syncer.sync(&lib, &target).await.map(|_| ());
                    (lib, result)
                });
            }
        }

        let mut failures = HashMap::new();
        while let Some(joined) = join.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((lib, Err(e))) => {
                    failures.insert(lib, e);
                }
                Err(join_error) => {
                    warn!(%join_error, "sync task failed to join");
                }
            }
        }
        failures
    }

    /// Run mount bindings and asset placements in parallel per lib.
    async fn run_mount_phase(
        &self,
        container: &ContainerId,
        mounts: Vec<MountBatch>,
        poisoned: &HashSet<LibName>,
    ) -> Vec<(LibName, ExecuteError)> {
        let mut join: JoinSet<(LibName, Result<(), ExecuteError>)> = JoinSet::new();

        for batch in mounts {
            if poisoned.contains(&batch.lib) {
                debug!(lib = %batch.lib, "skipping mount: sync failed upstream");
                continue;
            }
            let runtime = Arc::clone(&self.runtime);
            let container = container.clone();
            join.spawn(async move {
                let lib = batch.lib.clone();
                let result = Self::mount_one(&*runtime, &container, batch).await;
                (lib, result)
            });
        }

        let mut failures = Vec::new();
        while let Some(joined) = join.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((lib, Err(e))) => failures.push((lib, e)),
                Err(join_error) => {
                    warn!(%join_error, "mount task failed to join");
                }
            }
        }
        failures
    }

    async fn mount_one(
        runtime: &dyn ContainerRuntime,
        container: &ContainerId,
        batch: MountBatch,
    ) -> Result<(), ExecuteError> {
        runtime
            .bind_mount(container, &batch.host_path, &batch.mount)
            .await
            .map_err(|source| ExecuteError::Mount {
                lib: batch.lib.clone(),
                source,
            })?;
        debug!(lib = %batch.lib, mount = %batch.mount, "mounted");

        for (name, target, contents) in batch.assets {
            runtime
                .place_file(container, &target, &contents)
                .await
                .map_err(|source| ExecuteError::PlaceAsset {
                    lib: batch.lib.clone(),
                    asset: name.clone(),
                    source,
                })?;
            debug!(lib = %batch.lib, asset = %name, %target, "asset placed");
        }
        Ok(())
    }

    /// Wave-schedule install batches along dependency edges.
    ///
    /// A batch becomes ready when all its dependencies completed (ran or
    /// skipped by fingerprint). Independent branches run concurrently.
    /// The first failure stops new batches from starting; in-flight
    /// batches drain.
    async fn run_install_phase(
        &self,
        container: &ContainerId,
        record: &mut InstallExecutionRecord,
        lib_order: &[LibName],
        installs: Vec<InstallBatch>,
        poisoned: &HashSet<LibName>,
    ) -> Result<(), ExecuteError> {
        let batches: HashMap<LibName, InstallBatch> = installs
            .into_iter()
            .map(|batch| (batch.lib.clone(), batch))
            .collect();

        let mut completed: HashSet<LibName> = HashSet::new();
        let mut dispatched: HashSet<LibName> = HashSet::new();
        let mut join: JoinSet<(LibName, Result<Fingerprint, ExecuteError>)> = JoinSet::new();
        let mut aborted = false;
        let mut first_error: Option<ExecuteError> = None;

        loop {
            // Dispatch everything that became ready. Fingerprint skips
            // complete synchronously, so iterate to a fixpoint.
            let mut progressed = !aborted;
            while progressed {
                progressed = false;
                for lib in lib_order {
                    if dispatched.contains(lib) || poisoned.contains(lib) {
                        continue;
                    }
                    let Some(batch) = batches.get(lib) else {
                        continue;
                    };
                    if !batch.depends_on.iter().all(|dep| completed.contains(dep)) {
                        continue;
                    }

                    dispatched.insert(lib.clone());
                    if record.lib_is_current(lib, &batch.fingerprint) {
                        info!(lib = %lib, "install unchanged, skipping");
                        completed.insert(lib.clone());
                        progressed = true;
                        continue;
                    }

                    let runtime = Arc::clone(&self.runtime);
                    let container = container.clone();
                    let batch = batch.clone();
                    join.spawn(async move {
                        let lib = batch.lib.clone();
                        let result = Self::install_one(&*runtime, &container, batch).await;
                        (lib, result)
                    });
                }
                if aborted {
                    break;
                }
            }

            match join.join_next().await {
                Some(Ok((lib, Ok(fingerprint)))) => {
                    record.mark_lib_completed(lib.clone(), fingerprint);
                    if let Err(e) = self.records.save(container, record) {
                        aborted = true;
                        first_error.get_or_insert(e.into());
                    }
                    completed.insert(lib);
                }
                Some(Ok((lib, Err(e)))) => {
                    warn!(lib = %lib, error = %e, "install failed, draining in-flight work");
                    aborted = true;
                    first_error.get_or_insert(e);
                }
                Some(Err(join_error)) => {
                    aborted = true;
                    first_error
                        .get_or_insert(ExecuteError::Internal(format!(
                            "install task failed to join: {join_error}"
                        )));
                }
                None => break,
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn install_one(
        runtime: &dyn ContainerRuntime,
        container: &ContainerId,
        batch: InstallBatch,
    ) -> Result<Fingerprint, ExecuteError> {
        for command in &batch.commands {
            debug!(lib = %batch.lib, %command, "install command");
            let exit_code = runtime.exec(container, command).await.map_err(|source| {
                ExecuteError::Runtime {
                    owner: batch.lib.clone(),
                    source,
                }
            })?;
            if exit_code != 0 {
                return Err(ExecuteError::InstallCommand {
                    lib: batch.lib.clone(),
                    command: command.clone(),
                    exit_code,
                });
            }
        }
        Ok(batch.fingerprint)
    }

    /// Run the app's `once` and `always` commands.
    async fn run_app_phase(
        &self,
        container: &ContainerId,
        record: &mut InstallExecutionRecord,
        plan: &ProvisioningPlan,
    ) -> Result<(), ExecuteError> {
        for step in &plan.steps {
            match step {
                PlanStep::AppOnce { app, commands } => {
                    let fingerprint = Fingerprint::of_commands(commands);
                    if record.app_once_is_current(&fingerprint) {
                        info!(app = %app, "once-commands already ran, skipping");
                        continue;
                    }
                    self.run_app_commands(container, app, commands).await?;
                    record.mark_app_once_completed(fingerprint);
                    self.records.save(container, record)?;
                }
                PlanStep::AppAlways { app, commands } => {
                    self.run_app_commands(container, app, commands).await?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    async fn run_app_commands(
        &self,
        container: &ContainerId,
        app: &LibName,
        commands: &[String],
    ) -> Result<(), ExecuteError> {
        for command in commands {
            debug!(app = %app, %command, "app command");
            let exit_code =
                self.runtime
                    .exec(container, command)
                    .await
                    .map_err(|source| ExecuteError::Runtime {
                        owner: app.clone(),
                        source,
                    })?;
            if exit_code != 0 {
                return Err(ExecuteError::AppCommand {
                    app: app.clone(),
                    command: command.clone(),
                    exit_code,
                });
            }
        }
        Ok(())
    }

    // =========================================================================
    // Plan decomposition
    // =========================================================================

    fn install_batches(plan: &ProvisioningPlan) -> Vec<InstallBatch> {
        plan.steps
            .iter()
            .filter_map(|step| match step {
                PlanStep::Install {
                    lib,
                    commands,
                    depends_on,
                } => Some(InstallBatch {
                    lib: lib.clone(),
                    commands: commands.clone(),
                    depends_on: depends_on.clone(),
                    fingerprint: Fingerprint::of_commands(commands),
                }),
                _ => None,
            })
            .collect()
    }

    fn mount_batches(plan: &ProvisioningPlan) -> Vec<MountBatch> {
        let mut batches: Vec<MountBatch> = Vec::new();
        for step in &plan.steps {
            match step {
                PlanStep::Mount {
                    lib,
                    host_path,
                    mount,
                } => batches.push(MountBatch {
                    lib: lib.clone(),
                    host_path: host_path.clone(),
                    mount: mount.clone(),
                    assets: vec![],
                }),
                PlanStep::PlaceAsset {
                    lib,
                    name,
                    target,
                    contents,
                } => {
                    if let Some(batch) = batches.iter_mut().rev().find(|b| &b.lib == lib) {
                        batch
                            .assets
                            .push((name.clone(), target.clone(), contents.clone()));
                    }
                }
                _ => {}
            }
        }
        batches
    }

    /// The set of libs that must be skipped: the failed libs plus every
    /// transitive dependent. `lib_order` is topological, so one forward
    /// pass suffices.
    fn poison<'a>(
        lib_order: &[LibName],
        installs: &[InstallBatch],
        failed: impl Iterator<Item = &'a LibName>,
    ) -> HashSet<LibName> {
        let deps: HashMap<&LibName, &Vec<LibName>> = installs
            .iter()
            .map(|batch| (&batch.lib, &batch.depends_on))
            .collect();

        let mut poisoned: HashSet<LibName> = failed.cloned().collect();
        for lib in lib_order {
            if poisoned.contains(lib) {
                continue;
            }
            if let Some(lib_deps) = deps.get(lib) {
                if lib_deps.iter().any(|dep| poisoned.contains(dep)) {
                    poisoned.insert(lib.clone());
                }
            }
        }
        poisoned
    }

    /// Pick the error belonging to the earliest lib in plan order, for a
    /// deterministic "first" failure across parallel work.
    fn first_by_order(
        lib_order: &[LibName],
        failures: impl IntoIterator<Item = (LibName, ExecuteError)>,
    ) -> Option<ExecuteError> {
        let mut by_lib: HashMap<LibName, ExecuteError> = failures.into_iter().collect();
        lib_order.iter().find_map(|lib| by_lib.remove(lib))
    }
}
