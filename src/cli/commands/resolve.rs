//! resolve command - Preview an app's provisioning plan.

use std::path::Path;

use anyhow::Result;

use super::{find_app, provision_context};
use crate::ui::output::{self, Verbosity};

/// Resolve an app and print the ordered plan without executing it.
pub fn resolve(project_dir: &Path, app_name: &str, verbosity: Verbosity) -> Result<()> {
    let ctx = provision_context(project_dir)?;
    let app = find_app(&ctx.document, app_name)?;

    let plan = ctx.provisioner.resolve(app)?;
    output::print(plan.preview(), verbosity);
    output::debug(format!("plan digest: {}", plan.digest()), verbosity);
    Ok(())
}
