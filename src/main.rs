//! Stagehand CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use stagehand::cli::{Cli, CommandDispatcher};
use stagehand::ui::{TerminalUI, UserInterface};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// `--debug` forces DEBUG; otherwise `RUST_LOG` is honored, defaulting to
/// INFO. Logs go to stderr so they never mix with command output.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("stagehand=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stagehand=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("Stagehand starting with args: {:?}", cli);

    if cli.no_color {
        std::env::set_var("NO_COLOR", "1");
    }

    let project_root = cli
        .project
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    let mut ui = TerminalUI::new();
    let dispatcher = CommandDispatcher::new(project_root).with_state_dir(cli.state_dir.clone());

    match dispatcher.dispatch(&cli, &mut ui) {
        Ok(result) => ExitCode::from(result.exit_code as u8),
        Err(e) => {
            ui.error(&format!("Error: {}", e));
            ExitCode::from(1)
        }
    }
}
