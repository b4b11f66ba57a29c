//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--project <path>`: Run against that project directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Gantry - dependency-ordered provisioning for containerized dev
/// environments
#[derive(Parser, Debug)]
#[command(name = "gantry")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run against this project directory instead of the current one
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve an app's dependency graph and preview its provisioning plan
    #[command(
        name = "resolve",
        long_about = "Resolve an app's dependency graph and preview its provisioning plan.\n\n\
            Builds the lib dependency graph for the app, checks every relational \
            invariant (unknown references, cycles, required assets), and prints the \
            ordered plan without touching any repo or container."
    )]
    Resolve {
        /// App name from the spec file
        app: String,
    },

    /// Provision a running container for an app
    #[command(
        name = "provision",
        long_about = "Provision a running container for an app.\n\n\
            Syncs every lib repo the app depends on, mounts the synced sources and \
            registered assets into the container, and runs install commands in \
            dependency order. Re-running is idempotent: unchanged install command \
            lists are skipped."
    )]
    Provision {
        /// App name from the spec file
        app: String,

        /// Target container id or name
        #[arg(long)]
        container: String,
    },

    /// Show tracked repo state for all libs
    Repos,

    /// Manage registered assets
    Assets {
        #[command(subcommand)]
        action: AssetsAction,
    },

    /// Destroy a container's install record
    #[command(
        name = "forget",
        long_about = "Destroy a container's install record.\n\n\
            Use when the container itself has been removed; the next provision of a \
            container with the same id starts from a clean record."
    )]
    Forget {
        /// Container id or name
        container: String,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Asset registration actions.
#[derive(Subcommand, Debug)]
pub enum AssetsAction {
    /// Register (or replace) an asset from a local file
    Set {
        /// Registration name libs refer to
        name: String,
        /// Local file to register
        path: PathBuf,
    },
    /// Remove a registration
    Unset {
        /// Registration name
        name: String,
    },
    /// List registered asset names
    List,
}

/// Supported shells for completion generation.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Shell {
    /// Bash
    Bash,
    /// Zsh
    Zsh,
    /// Fish
    Fish,
    /// PowerShell
    PowerShell,
}
