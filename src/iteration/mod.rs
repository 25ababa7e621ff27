//! Bounded, paced iteration inside a step body.

pub mod controller;
pub mod stop;

pub use controller::{
    IterationController, LoopFailure, LoopOutcome, LoopProgress, DEFAULT_SAFETY_CAP,
};
pub use stop::StopHandle;
