//! Step execution orchestration.

pub mod dependency;
pub mod hooks;
pub mod step;
pub mod workflow;

pub use dependency::{DependencyGraph, DependencyGraphBuilder};
pub use hooks::{StepErrorEvent, StepEvent, StepHooks, StepObserver};
pub use step::Step;
pub use workflow::{RunOptions, RunResult, Runner};
