mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// Project directory from `-C` or `DEVPLAN_PROJECT_DIR`
    pub project: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        project: cli.project,
    };

    match cli.command {
        Command::Execute(args) => commands::execute::run(&ctx, args),
        Command::Order(args) => commands::order::run(&ctx, args),
        Command::Snapshot(cmd) => commands::snapshot::run(&ctx, cmd),
        Command::Rollback { id, yes } => commands::rollback::run(&ctx, &id, yes),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "devplan", &mut io::stdout());
            Ok(())
        }
    }
}
