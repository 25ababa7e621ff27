//! Clear command implementation.
//!
//! The `stagehand clear` command deletes a run's records, or one step's.

use std::path::{Path, PathBuf};

use crate::cli::args::ClearArgs;
use crate::config::{Mode, PersistPolicy};
use crate::error::Result;
use crate::state::StateStore;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// The clear command implementation.
pub struct ClearCommand {
    state_dir: PathBuf,
    args: ClearArgs,
}

impl ClearCommand {
    pub fn new(state_dir: &Path, args: ClearArgs) -> Self {
        Self {
            state_dir: state_dir.to_path_buf(),
            args,
        }
    }
}

impl Command for ClearCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let store = StateStore::new(
            &self.state_dir,
            &self.args.run,
            Mode::Production,
            PersistPolicy::Always,
        )?;

        match &self.args.step {
            Some(step) => {
                store.clear_step(step)?;
                ui.success(&format!("Cleared step '{}' of run '{}'", step, self.args.run));
            }
            None => {
                let removed = store.clear_run()?;
                if removed == 0 {
                    ui.warning(&format!("No records for run '{}'", self.args.run));
                } else {
                    let noun = if removed == 1 { "record" } else { "records" };
                    ui.success(&format!(
                        "Cleared {} {} of run '{}'",
                        removed, noun, self.args.run
                    ));
                }
            }
        }

        Ok(CommandResult::success())
    }
}
