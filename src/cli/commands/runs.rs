//! Runs command implementation.
//!
//! The `stagehand runs` command lists runs found in the state directory.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::state::StateStore;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// The runs command implementation.
pub struct RunsCommand {
    state_dir: PathBuf,
}

impl RunsCommand {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            state_dir: state_dir.to_path_buf(),
        }
    }
}

impl Command for RunsCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let runs = StateStore::list_runs(&self.state_dir)?;

        if runs.is_empty() {
            ui.message(&format!(
                "No runs recorded in {}",
                self.state_dir.display()
            ));
            return Ok(CommandResult::success());
        }

        ui.show_header("Runs");
        for run in &runs {
            let steps = if run.step_count == 1 { "step" } else { "steps" };
            ui.message(&format!(
                "  {}  {} {}  updated {}",
                run.run_id,
                run.step_count,
                steps,
                run.last_updated.format("%Y-%m-%d %H:%M:%S")
            ));
        }

        Ok(CommandResult::success())
    }
}
