//! Resume points derived from a run's step log records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::record::StepLogRecord;

/// Read-only snapshot of where a run stopped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeState {
    pub run_id: String,

    /// Step to resume at; empty when nothing was recorded.
    pub current_step_id: String,

    /// Progress marker of the current step.
    pub step_index: u64,

    /// Steps whose record is not in progress.
    pub completed_step_ids: Vec<String>,

    /// Steps with at least one recorded failure.
    pub failed_step_ids: Vec<String>,

    /// Per-step payloads, keyed by step id.
    pub payload: BTreeMap<String, Map<String, Value>>,
}

impl ResumeState {
    /// Aggregate records (ordered by `updated_at` ascending) into a resume point.
    ///
    /// The current step is `explicit_step` when given, else the most recently
    /// updated step that is in progress, else the most recently updated step.
    pub fn from_records(
        run_id: impl Into<String>,
        records: &[StepLogRecord],
        explicit_step: Option<&str>,
    ) -> Self {
        let current = match explicit_step {
            Some(step) => records.iter().find(|r| r.step_id == step),
            None => records
                .iter()
                .rev()
                .find(|r| r.in_progress())
                .or_else(|| records.last()),
        };

        let current_step_id = match (explicit_step, current) {
            (Some(step), _) => step.to_string(),
            (None, Some(record)) => record.step_id.clone(),
            (None, None) => String::new(),
        };

        Self {
            run_id: run_id.into(),
            current_step_id,
            step_index: current.map_or(0, |r| r.index),
            completed_step_ids: records
                .iter()
                .filter(|r| !r.in_progress())
                .map(|r| r.step_id.clone())
                .collect(),
            failed_step_ids: records
                .iter()
                .filter(|r| r.has_failures())
                .map(|r| r.step_id.clone())
                .collect(),
            payload: records
                .iter()
                .filter_map(|r| r.payload.clone().map(|p| (r.step_id.clone(), p)))
                .collect(),
        }
    }

    /// Whether there is nothing to resume from.
    pub fn is_empty(&self) -> bool {
        self.current_step_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::record::FailureMarker;
    use serde_json::json;

    fn record(step: &str, index: u64) -> StepLogRecord {
        let mut record = StepLogRecord::new(step);
        record.index = index;
        record
    }

    #[test]
    fn empty_records_give_initial_state() {
        let state = ResumeState::from_records("run_1", &[], None);
        assert_eq!(state.current_step_id, "");
        assert_eq!(state.step_index, 0);
        assert!(state.is_empty());
        assert!(state.completed_step_ids.is_empty());
    }

    #[test]
    fn in_progress_step_wins() {
        let records = vec![record("step1", 0), record("step2", 10)];
        let state = ResumeState::from_records("run_1", &records, None);

        assert_eq!(state.current_step_id, "step2");
        assert_eq!(state.step_index, 10);
        assert_eq!(state.completed_step_ids, vec!["step1"]);
    }

    #[test]
    fn in_progress_beats_more_recent_idle_step() {
        let records = vec![record("step1", 4), record("step2", 0)];
        let state = ResumeState::from_records("run_1", &records, None);
        assert_eq!(state.current_step_id, "step1");
        assert_eq!(state.step_index, 4);
    }

    #[test]
    fn falls_back_to_most_recent_step() {
        let records = vec![record("step1", 0), record("step2", 0)];
        let state = ResumeState::from_records("run_1", &records, None);
        assert_eq!(state.current_step_id, "step2");
        assert_eq!(state.step_index, 0);
    }

    #[test]
    fn explicit_step_overrides_inference() {
        let records = vec![record("step1", 3), record("step2", 10)];
        let state = ResumeState::from_records("run_1", &records, Some("step1"));
        assert_eq!(state.current_step_id, "step1");
        assert_eq!(state.step_index, 3);

        let unknown = ResumeState::from_records("run_1", &records, Some("later"));
        assert_eq!(unknown.current_step_id, "later");
        assert_eq!(unknown.step_index, 0);
    }

    #[test]
    fn collects_failures_and_payloads() {
        let mut failing = record("fetch", 2);
        failing.fails.push(FailureMarker::Index(1));
        let mut with_payload = record("list", 0);
        with_payload.payload = json!({"pages": 4}).as_object().cloned();

        let state = ResumeState::from_records("run_1", &[with_payload, failing], None);
        assert_eq!(state.failed_step_ids, vec!["fetch"]);
        assert_eq!(state.payload["list"]["pages"], json!(4));
        assert!(!state.payload.contains_key("fetch"));
    }
}
