//! Status command implementation.
//!
//! The `stagehand status` command shows a run's step records and the resume
//! point derived from them.

use std::path::{Path, PathBuf};

use crate::cli::args::StatusArgs;
use crate::config::{Mode, PersistPolicy};
use crate::error::Result;
use crate::state::{StateStore, StepLogRecord};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// The status command implementation.
pub struct StatusCommand {
    state_dir: PathBuf,
    args: StatusArgs,
}

impl StatusCommand {
    pub fn new(state_dir: &Path, args: StatusArgs) -> Self {
        Self {
            state_dir: state_dir.to_path_buf(),
            args,
        }
    }

    pub fn args(&self) -> &StatusArgs {
        &self.args
    }

    fn store(&self) -> Result<StateStore> {
        StateStore::new(
            &self.state_dir,
            &self.args.run,
            Mode::Production,
            PersistPolicy::Always,
        )
    }
}

fn describe(record: &StepLogRecord) -> String {
    let mut line = format!(
        "  {}  index {}  updated {}",
        record.step_id,
        record.index,
        record.updated_at.format("%Y-%m-%d %H:%M:%S")
    );
    if record.has_failures() {
        let fails: Vec<String> = record.fails.iter().map(ToString::to_string).collect();
        line.push_str(&format!("  fails [{}]", fails.join(", ")));
    }
    line
}

impl Command for StatusCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let store = self.store()?;
        let records = store.get_all_records()?;

        if records.is_empty() {
            ui.error(&format!("No records for run '{}'", self.args.run));
            return Ok(CommandResult::failure(1));
        }

        let resume = store.build_resume_state(None)?;

        if self.args.json {
            let json = serde_json::to_string_pretty(&resume).map_err(anyhow::Error::from)?;
            ui.message(&json);
            return Ok(CommandResult::success());
        }

        ui.show_header(&format!("Run {}", self.args.run));
        for record in &records {
            ui.message(&describe(record));
        }

        ui.message("");
        ui.show_field("Current step", &resume.current_step_id);
        ui.show_field("Step index", &resume.step_index.to_string());
        ui.show_field("Completed", &resume.completed_step_ids.join(", "));
        if resume.failed_step_ids.is_empty() {
            ui.show_field("Failed", "none");
        } else {
            ui.show_field("Failed", &resume.failed_step_ids.join(", "));
        }

        Ok(CommandResult::success())
    }
}
