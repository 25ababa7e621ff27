//! Command dispatching.
//!
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cli::args::{Cli, Commands};
use crate::config::load_engine_config;
use crate::error::Result;
use crate::ui::UserInterface;

/// Trait for command implementations.
pub trait Command {
    /// Execute the command, reporting through `ui`.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    project_root: PathBuf,
    state_dir: Option<PathBuf>,
}

impl CommandDispatcher {
    /// Create a dispatcher for the given project root.
    pub fn new(project_root: PathBuf) -> Self {
        Self {
            project_root,
            state_dir: None,
        }
    }

    /// Use this state directory instead of the configured one.
    pub fn with_state_dir(mut self, state_dir: Option<PathBuf>) -> Self {
        self.state_dir = state_dir;
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// The state directory commands operate on.
    ///
    /// An explicit directory wins; otherwise it comes from the project's
    /// configuration.
    pub fn resolve_state_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.state_dir {
            return Ok(dir.clone());
        }
        let config = load_engine_config(&self.project_root)?;
        Ok(config.state_dir)
    }

    /// Dispatch and execute a command.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let state_dir = self.resolve_state_dir()?;
        debug!("Using state directory {}", state_dir.display());

        match &cli.command {
            Commands::Runs => super::runs::RunsCommand::new(&state_dir).execute(ui),
            Commands::Status(args) => {
                super::status::StatusCommand::new(&state_dir, args.clone()).execute(ui)
            }
            Commands::Clear(args) => {
                super::clear::ClearCommand::new(&state_dir, args.clone()).execute(ui)
            }
        }
    }
}
