use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::paths::ENV_PROJECT_DIR;

#[derive(Parser)]
#[command(name = "devplan")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Run phased development plans with snapshots and rollback", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Project directory (defaults to the current directory)
    #[arg(short = 'C', long = "project", global = true, env = ENV_PROJECT_DIR)]
    pub project: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Execute a plan against the project
    Execute(ExecuteArgs),

    /// Show the resolved phase order of a plan
    Order(OrderArgs),

    /// Manage project snapshots
    #[command(subcommand)]
    Snapshot(SnapshotCommand),

    /// Restore the project to a snapshot
    Rollback {
        /// Snapshot id
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Execute / Order
// ============================================================================

#[derive(Args)]
pub struct ExecuteArgs {
    /// Plan file (defaults to the configured plan, `project.devplan`)
    pub plan: Option<PathBuf>,

    /// Show what would change without touching the project
    #[arg(long)]
    pub dry_run: bool,

    /// Print the execution result as JSON
    #[arg(long)]
    pub json: bool,

    /// Description for the pre-execution snapshot
    #[arg(short, long)]
    pub description: Option<String>,
}

#[derive(Args)]
pub struct OrderArgs {
    /// Plan file (defaults to the configured plan, `project.devplan`)
    pub plan: Option<PathBuf>,

    /// Also print each phase's dependents
    #[arg(long)]
    pub graph: bool,

    /// Print the order as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// Snapshot Commands
// ============================================================================

#[derive(Subcommand)]
pub enum SnapshotCommand {
    /// Capture the current project state
    Create {
        /// Free-text label for the snapshot
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List snapshots, newest first
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show details of one snapshot
    Show {
        /// Snapshot id
        id: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a snapshot
    Delete {
        /// Snapshot id
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}
