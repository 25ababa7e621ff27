//! Command-line interface for Stagehand.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{ClearArgs, Cli, Commands, StatusArgs};
pub use commands::{Command, CommandDispatcher, CommandResult};
