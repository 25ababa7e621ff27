//! Error types for Stagehand operations.
//!
//! This module defines [`StagehandError`], the primary error type used
//! throughout the engine, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Resolution errors (missing or circular dependencies) are raised before
//!   any step runs and are never partially applied
//! - A failing step body aborts the run with [`StagehandError::StepExecution`];
//!   the body's own error stays reachable through `source()`
//! - Per-item failures inside an iteration loop are captured, never raised
//! - Use `anyhow::Error` for user-supplied code (step bodies, hooks, callbacks)

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Lifecycle phase a hook fired in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    BeforeStep,
    AfterStep,
    OnError,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HookPhase::BeforeStep => "before_step",
            HookPhase::AfterStep => "after_step",
            HookPhase::OnError => "on_error",
        };
        write!(f, "{}", s)
    }
}

/// Core error type for Stagehand operations.
#[derive(Debug, Error)]
pub enum StagehandError {
    /// A step declares a dependency that is not part of the step set.
    #[error("Step '{step}' depends on missing step '{dependency}'")]
    MissingDependency { step: String, dependency: String },

    /// The dependency graph contains at least one cycle.
    #[error("Circular dependency detected among steps: {}", steps.join(", "))]
    CircularDependency { steps: Vec<String> },

    /// The same step id was supplied more than once.
    #[error("Duplicate step id: {step}")]
    DuplicateStep { step: String },

    /// A resume start position lies outside the resolved step order.
    #[error("Invalid step index {index} (pipeline has {total} steps)")]
    InvalidStepIndex { index: usize, total: usize },

    /// A run id that cannot key state records.
    #[error("Invalid run id '{run_id}': {reason}")]
    InvalidRunId { run_id: String, reason: String },

    /// A step id that cannot be used in a state record file name.
    #[error("Invalid step id '{step}': {reason}")]
    InvalidStepId { step: String, reason: String },

    /// A resume names a step that is not part of the pipeline.
    #[error("Unknown step: {step}")]
    UnknownStep { step: String },

    /// A step body failed; the run was aborted.
    #[error("Step '{step}' failed: {source}")]
    StepExecution {
        step: String,
        index: usize,
        total: usize,
        completed_steps: Vec<String>,
        #[source]
        source: anyhow::Error,
    },

    /// A lifecycle hook failed.
    #[error("Hook {phase} for step '{step}' failed: {source}")]
    Hook {
        step: String,
        phase: HookPhase,
        #[source]
        source: anyhow::Error,
    },

    /// Failed to parse a persisted state file that had to be read.
    #[error("Failed to parse state at {path}: {message}")]
    StateParse { path: PathBuf, message: String },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration structure or values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StagehandError {
    /// Whether this error was raised while resolving the step order.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            StagehandError::MissingDependency { .. }
                | StagehandError::CircularDependency { .. }
                | StagehandError::DuplicateStep { .. }
        )
    }

    /// Steps that completed before a step failure aborted the run.
    pub fn completed_steps(&self) -> &[String] {
        match self {
            StagehandError::StepExecution {
                completed_steps, ..
            } => completed_steps,
            _ => &[],
        }
    }
}

/// Result type alias for Stagehand operations.
pub type Result<T> = std::result::Result<T, StagehandError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn missing_dependency_names_both_steps() {
        let err = StagehandError::MissingDependency {
            step: "parse".into(),
            dependency: "fetch".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("parse"));
        assert!(msg.contains("fetch"));
        assert!(err.is_resolution_error());
    }

    #[test]
    fn circular_dependency_lists_steps() {
        let err = StagehandError::CircularDependency {
            steps: vec!["a".into(), "b".into()],
        };
        assert!(err.to_string().contains("a, b"));
    }

    #[test]
    fn step_execution_keeps_source_error() {
        let err = StagehandError::StepExecution {
            step: "download".into(),
            index: 1,
            total: 3,
            completed_steps: vec!["setup".into()],
            source: anyhow::anyhow!("connection reset"),
        };
        assert!(err.to_string().contains("download"));
        assert_eq!(err.source().unwrap().to_string(), "connection reset");
        assert_eq!(err.completed_steps(), ["setup".to_string()]);
        assert!(!err.is_resolution_error());
    }

    #[test]
    fn hook_error_displays_phase() {
        let err = StagehandError::Hook {
            step: "a".into(),
            phase: HookPhase::OnError,
            source: anyhow::anyhow!("boom"),
        };
        assert!(err.to_string().contains("on_error"));
    }

    #[test]
    fn invalid_step_index_displays_bounds() {
        let err = StagehandError::InvalidStepIndex { index: 7, total: 3 };
        let msg = err.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains('3'));
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StagehandError = io_err.into();
        assert!(matches!(err, StagehandError::Io(_)));
    }

    #[test]
    fn invalid_run_id_explains_reason() {
        let err = StagehandError::InvalidRunId {
            run_id: "job-2".into(),
            reason: "must not contain '-'".into(),
        };
        assert_eq!(err.to_string(), "Invalid run id 'job-2': must not contain '-'");
    }

    #[test]
    fn completed_steps_empty_for_other_errors() {
        let err = StagehandError::UnknownStep { step: "x".into() };
        assert!(err.completed_steps().is_empty());
    }
}
