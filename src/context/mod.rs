//! Per-run execution context.
//!
//! An [`ExecutionContext`] is built once per run or resume and handed to
//! every step body in turn. Its identity and configuration are fixed for the
//! lifetime of the run; `data`, `step_state` and `metadata` are mutated by
//! steps cooperatively, since steps never run concurrently.

pub mod id;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use crate::config::RunConfig;

pub use id::{validate_run_id, FixedRunId, RunId, RunIdGenerator, TimestampRunId};

/// Shared cross-step data chosen by the pipeline author.
///
/// `seed` is called when a run is resumed, with each step's persisted
/// payload keyed by step id.
pub trait SharedData {
    /// Restore state from persisted step payloads.
    fn seed(&mut self, _payload: &BTreeMap<String, Map<String, Value>>) -> anyhow::Result<()> {
        Ok(())
    }
}

impl SharedData for () {}

impl<T> SharedData for Vec<T> {}

impl SharedData for Map<String, Value> {
    fn seed(&mut self, payload: &BTreeMap<String, Map<String, Value>>) -> anyhow::Result<()> {
        for (step, data) in payload {
            self.insert(step.clone(), Value::Object(data.clone()));
        }
        Ok(())
    }
}

impl SharedData for HashMap<String, Value> {
    fn seed(&mut self, payload: &BTreeMap<String, Map<String, Value>>) -> anyhow::Result<()> {
        for (step, data) in payload {
            self.insert(step.clone(), Value::Object(data.clone()));
        }
        Ok(())
    }
}

/// Mutable bag plus immutable identity for one run.
#[derive(Debug, Clone)]
pub struct ExecutionContext<D> {
    run_id: String,
    started_at: DateTime<Utc>,
    config: RunConfig,

    /// Shared data visible to all steps.
    pub data: D,

    /// Step-private state, keyed by step id.
    pub step_state: HashMap<String, Value>,

    /// Cross-cutting values such as last-request timestamps.
    pub metadata: HashMap<String, Value>,
}

impl<D> ExecutionContext<D> {
    /// Create a context for a new run.
    pub fn new(run_id: impl Into<String>, config: RunConfig, data: D) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Utc::now(),
            config,
            data,
            step_state: HashMap::new(),
            metadata: HashMap::new(),
        }
    }

    /// The run identifier.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// When the run started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// The run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Step-private state for `step`, if any.
    pub fn state_of(&self, step: &str) -> Option<&Value> {
        self.step_state.get(step)
    }

    /// Replace step-private state for `step`.
    pub fn set_state_of(&mut self, step: impl Into<String>, value: Value) {
        self.step_state.insert(step.into(), value);
    }

    /// Consume the context, returning the shared data.
    pub fn into_data(self) -> D {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use serde_json::json;

    #[test]
    fn context_keeps_identity() {
        let ctx = ExecutionContext::new("run_1", RunConfig::default(), ());
        assert_eq!(ctx.run_id(), "run_1");
        assert_eq!(ctx.config().mode, Mode::Development);
        assert!(ctx.step_state.is_empty());
    }

    #[test]
    fn step_state_is_keyed_by_step() {
        let mut ctx = ExecutionContext::new("run_1", RunConfig::default(), ());
        ctx.set_state_of("fetch", json!({"page": 3}));
        assert_eq!(ctx.state_of("fetch"), Some(&json!({"page": 3})));
        assert_eq!(ctx.state_of("parse"), None);
    }

    #[test]
    fn map_data_seeds_from_payload() {
        let mut payload = BTreeMap::new();
        let mut fetch = Map::new();
        fetch.insert("cursor".into(), json!("abc"));
        payload.insert("fetch".to_string(), fetch);

        let mut data = Map::new();
        data.seed(&payload).unwrap();
        assert_eq!(data["fetch"]["cursor"], json!("abc"));
    }

    #[test]
    fn unit_data_ignores_payload() {
        let mut payload = BTreeMap::new();
        payload.insert("fetch".to_string(), Map::new());
        assert!(().seed(&payload).is_ok());
    }

    #[test]
    fn into_data_returns_shared_data() {
        let mut ctx = ExecutionContext::new("run_1", RunConfig::default(), vec![1, 2]);
        ctx.data.push(3);
        assert_eq!(ctx.into_data(), vec![1, 2, 3]);
    }
}
