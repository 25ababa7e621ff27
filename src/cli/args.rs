//! CLI argument definitions.
//!
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stagehand - inspect and clear resumable pipeline state.
#[derive(Debug, Parser)]
#[command(name = "stagehand")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// State directory (overrides the configured one)
    #[arg(long, global = true, env = "STAGEHAND_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Path to project root (overrides current directory)
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List runs with recorded state
    Runs,

    /// Show the records and resume point of a run
    Status(StatusArgs),

    /// Delete the records of a run or one of its steps
    Clear(ClearArgs),
}

/// Arguments for the `status` command.
#[derive(Debug, Clone, clap::Args)]
pub struct StatusArgs {
    /// Run id
    #[arg(long)]
    pub run: String,

    /// Print the resume state as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `clear` command.
#[derive(Debug, Clone, clap::Args)]
pub struct ClearArgs {
    /// Run id
    #[arg(long)]
    pub run: String,

    /// Only clear this step
    #[arg(long)]
    pub step: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_status_with_globals_after_subcommand() {
        let cli = Cli::parse_from([
            "stagehand",
            "status",
            "--run",
            "run_1",
            "--json",
            "--state-dir",
            "/tmp/state",
        ]);
        assert_eq!(cli.state_dir, Some(PathBuf::from("/tmp/state")));
        match cli.command {
            Commands::Status(args) => {
                assert_eq!(args.run, "run_1");
                assert!(args.json);
            }
            other => panic!("expected status, got {:?}", other),
        }
    }

    #[test]
    fn clear_step_is_optional() {
        let cli = Cli::parse_from(["stagehand", "clear", "--run", "run_1"]);
        match cli.command {
            Commands::Clear(args) => assert!(args.step.is_none()),
            other => panic!("expected clear, got {:?}", other),
        }
    }

    #[test]
    fn status_requires_run() {
        assert!(Cli::try_parse_from(["stagehand", "status"]).is_err());
    }
}
