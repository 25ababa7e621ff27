//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait and is routed by
//! [`CommandDispatcher`]. Commands only read and delete records; they never
//! run steps.

pub mod clear;
pub mod dispatcher;
pub mod runs;
pub mod status;

pub use dispatcher::{Command, CommandDispatcher, CommandResult};
