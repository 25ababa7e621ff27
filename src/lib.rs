//! Stagehand - a resumable step pipeline engine.
//!
//! A pipeline is a set of named [`runner::Step`]s with declared
//! dependencies. The [`runner::Runner`] resolves them into one order and
//! runs them strictly one at a time, firing lifecycle hooks around each.
//! Long-running steps drive an [`iteration::IterationController`], which
//! paces work, caps it outside production, and records progress in a
//! [`state::StateStore`] so an interrupted run can pick up where it stopped.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface for inspecting recorded state
//! - [`config`] - Run configuration and config file loading
//! - [`context`] - Per-run execution context and run ids
//! - [`error`] - Error types and result aliases
//! - [`io`] - Fetcher and sink interfaces for step bodies
//! - [`iteration`] - Bounded, paced loops with failure capture
//! - [`runner`] - Dependency resolution and step execution
//! - [`state`] - Resumable per-step state records
//! - [`ui`] - Terminal output for the CLI
//!
//! # Example
//!
//! ```
//! use stagehand::config::RunConfig;
//! use stagehand::context::ExecutionContext;
//! use stagehand::runner::{RunOptions, Runner, Step};
//!
//! let steps: Vec<Step<Vec<&str>>> = vec![
//!     Step::new("report", |ctx: &mut ExecutionContext<Vec<&str>>| {
//!         ctx.data.push("report");
//!         Ok(())
//!     })
//!     .depends_on(["collect"]),
//!     Step::new("collect", |ctx: &mut ExecutionContext<Vec<&str>>| {
//!         ctx.data.push("collect");
//!         Ok(())
//!     }),
//! ];
//!
//! let result = Runner::new(steps, RunConfig::default())
//!     .run(Vec::new(), RunOptions::default())
//!     .unwrap();
//! assert_eq!(result.data, ["collect", "report"]);
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod io;
pub mod iteration;
pub mod runner;
pub mod state;
pub mod ui;

pub use error::{Result, StagehandError};
