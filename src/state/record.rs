//! Per-step log records as persisted on disk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A recorded failure: an item index or an opaque item id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FailureMarker {
    Index(u64),
    Id(String),
}

impl fmt::Display for FailureMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureMarker::Index(i) => write!(f, "{}", i),
            FailureMarker::Id(id) => write!(f, "{}", id),
        }
    }
}

impl From<u64> for FailureMarker {
    fn from(index: u64) -> Self {
        FailureMarker::Index(index)
    }
}

impl From<usize> for FailureMarker {
    fn from(index: usize) -> Self {
        FailureMarker::Index(index as u64)
    }
}

impl From<&str> for FailureMarker {
    fn from(id: &str) -> Self {
        FailureMarker::Id(id.to_string())
    }
}

impl From<String> for FailureMarker {
    fn from(id: String) -> Self {
        FailureMarker::Id(id)
    }
}

/// Progress and failures of one step within one run.
///
/// `index == 0` means the step is not in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepLogRecord {
    pub step_id: String,

    /// Progress marker within the step's iteration.
    pub index: u64,

    /// Failure markers in the order they were recorded.
    #[serde(default)]
    pub fails: Vec<FailureMarker>,

    pub updated_at: DateTime<Utc>,

    /// Opaque per-step resume data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Map<String, Value>>,
}

impl StepLogRecord {
    /// A fresh record: not in progress, no failures.
    pub fn new(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            index: 0,
            fails: Vec::new(),
            updated_at: Utc::now(),
            payload: None,
        }
    }

    /// Whether the step is mid-iteration.
    pub fn in_progress(&self) -> bool {
        self.index > 0
    }

    /// Whether any failure has been recorded.
    pub fn has_failures(&self) -> bool {
        !self.fails.is_empty()
    }

    /// Set the progress marker. Resetting to zero discards failures.
    pub fn set_index(&mut self, index: u64) {
        self.index = index;
        if index == 0 {
            self.fails.clear();
        }
        self.touch();
    }

    /// Append a failure marker.
    pub fn push_failure(&mut self, marker: FailureMarker) {
        self.fails.push(marker);
        self.touch();
    }

    /// Shallow-merge `payload` into the record's payload.
    pub fn merge_payload(&mut self, payload: Map<String, Value>) {
        self.payload.get_or_insert_with(Map::new).extend(payload);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_record_is_idle() {
        let record = StepLogRecord::new("fetch");
        assert_eq!(record.index, 0);
        assert!(record.fails.is_empty());
        assert!(!record.in_progress());
        assert!(record.payload.is_none());
    }

    #[test]
    fn reset_clears_failures() {
        let mut record = StepLogRecord::new("fetch");
        record.set_index(4);
        record.push_failure(2usize.into());
        record.set_index(5);
        assert_eq!(record.fails, vec![FailureMarker::Index(2)]);

        record.set_index(0);
        assert!(record.fails.is_empty());
    }

    #[test]
    fn merge_payload_is_shallow() {
        let mut record = StepLogRecord::new("fetch");
        record.merge_payload(json!({"a": 1, "nested": {"x": 1}}).as_object().unwrap().clone());
        record.merge_payload(json!({"b": 2, "nested": {"y": 2}}).as_object().unwrap().clone());

        let payload = record.payload.unwrap();
        assert_eq!(payload["a"], json!(1));
        assert_eq!(payload["b"], json!(2));
        assert_eq!(payload["nested"], json!({"y": 2}));
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let mut record = StepLogRecord::new("fetch");
        record.push_failure(FailureMarker::Index(3));
        record.push_failure("item-9".into());

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["stepId"], json!("fetch"));
        assert_eq!(value["fails"], json!([3, "item-9"]));
        assert!(value["updatedAt"].is_string());
        assert!(value.get("payload").is_none());
    }

    #[test]
    fn parses_persisted_layout() {
        let raw = r#"{"stepId":"list","index":7,"fails":[1,"abc"],"updatedAt":"2024-05-01T10:00:00Z","payload":{"page":2}}"#;
        let record: StepLogRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.step_id, "list");
        assert_eq!(record.index, 7);
        assert_eq!(
            record.fails,
            vec![FailureMarker::Index(1), FailureMarker::Id("abc".into())]
        );
        assert_eq!(record.payload.unwrap()["page"], json!(2));
    }

    #[test]
    fn failure_marker_display() {
        assert_eq!(FailureMarker::Index(4).to_string(), "4");
        assert_eq!(FailureMarker::from("x").to_string(), "x");
    }
}
