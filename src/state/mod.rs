//! Resumable per-run, per-step state.
//!
//! - [`StepLogRecord`] - progress and failures of one step in one run
//! - [`StateStore`] - file-backed store of those records
//! - [`ResumeState`] - resume point derived from a run's records
//! - [`StepProgress`] - a step's record bound to an iteration loop

pub mod progress;
pub mod record;
pub mod resume;
pub mod store;

pub use progress::StepProgress;
pub use record::{FailureMarker, StepLogRecord};
pub use resume::ResumeState;
pub use store::{RunSummary, StateStore};
