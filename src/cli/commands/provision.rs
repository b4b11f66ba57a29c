//! provision command - Resolve and execute against a container.

use std::path::Path;

use anyhow::{bail, Result};

use super::{find_app, provision_context};
use crate::core::types::ContainerId;
use crate::engine::ExecuteResult;
use crate::ui::output::{self, Verbosity};

/// Provision a running container for an app.
pub async fn provision(
    project_dir: &Path,
    app_name: &str,
    container: &str,
    verbosity: Verbosity,
) -> Result<()> {
    let container = ContainerId::new(container)?;
    let ctx = provision_context(project_dir)?;
    let app = find_app(&ctx.document, app_name)?;

    let plan = ctx.provisioner.resolve(app)?;
    output::debug(plan.preview(), verbosity);

    match ctx.provisioner.execute(&container, &plan).await {
        ExecuteResult::Ready { run_id } => {
            output::success(
                format!("{app_name} provisioned into {container} (run {run_id})"),
                verbosity,
            );
            Ok(())
        }
        ExecuteResult::Failed {
            error,
            failing_lib,
            phase,
        } => {
            // Name the failing lib and step so the operator can fix the
            // spec or external resource and re-run.
            match failing_lib {
                Some(lib) => bail!("provisioning failed during {phase} on lib '{lib}': {error}"),
                None => bail!("provisioning failed during {phase}: {error}"),
            }
        }
    }
}
