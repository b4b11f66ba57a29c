use anyhow::Result;
use tracing_subscriber::EnvFilter;

use gantry::cli;
use gantry::ui::output;

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostic logging goes to stderr, filtered by GANTRY_LOG
    // (e.g. GANTRY_LOG=gantry=debug). Operator-facing output is separate.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("GANTRY_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run().await {
        output::error(format!("{e:#}"));
        std::process::exit(1);
    }
    Ok(())
}
