//! cli
//!
//! Command-line interface layer for Gantry.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Delegate to command handlers
//! - Does NOT sync repos or mutate containers directly
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to
//! the [`crate::engine`] for execution. All side effects flow through the
//! engine's resolve/execute model.

pub mod args;
pub mod commands;
pub mod specfile;

pub use args::{Cli, Command, Shell};

use anyhow::Result;

use crate::ui::output::Verbosity;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub async fn run() -> Result<()> {
    let cli = Cli::parse_args();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);

    let project_dir = match cli.project.clone() {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Command::Resolve { app } => commands::resolve(&project_dir, &app, verbosity),
        Command::Provision { app, container } => {
            commands::provision(&project_dir, &app, &container, verbosity).await
        }
        Command::Repos => commands::repos(&project_dir, verbosity).await,
        Command::Assets { action } => commands::assets(&project_dir, action, verbosity),
        Command::Forget { container } => commands::forget(&project_dir, &container, verbosity),
        Command::Completion { shell } => commands::completion(shell),
    }
}
