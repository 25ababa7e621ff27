//! Run identifier generation and parsing.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::error::{Result, StagehandError};

/// A unique run identifier.
///
/// Format: `run_{timestamp_ms}_{random_hex}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId {
    timestamp: DateTime<Utc>,
    random: [u8; 8],
}

impl RunId {
    /// Generate a new run ID from the wall clock and OS randomness.
    pub fn new() -> Self {
        let now = Utc::now();
        // Truncate to milliseconds for consistent serialization
        let timestamp = DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);

        let mut random = [0u8; 8];
        if getrandom::getrandom(&mut random).is_err() {
            let nanos = now.timestamp_nanos_opt().unwrap_or_default() as u64;
            random = nanos.to_le_bytes();
        }

        Self { timestamp, random }
    }

    /// Get the run timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Parse a run ID from a string.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.strip_prefix("run_")?;
        let (millis, random_hex) = s.split_once('_')?;

        let ts_millis: i64 = millis.parse().ok()?;
        let timestamp = DateTime::from_timestamp_millis(ts_millis)?;
        let random_bytes = hex::decode(random_hex).ok()?;
        let random: [u8; 8] = random_bytes.try_into().ok()?;

        Some(Self { timestamp, random })
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_{}_{}",
            self.timestamp.timestamp_millis(),
            hex::encode(self.random)
        )
    }
}

/// Source of run identifiers, injectable so runs stay deterministic in tests.
pub trait RunIdGenerator {
    /// Produce a fresh run identifier.
    fn generate(&self) -> String;
}

/// Default generator: wall-clock milliseconds plus 8 random bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampRunId;

impl RunIdGenerator for TimestampRunId {
    fn generate(&self) -> String {
        RunId::new().to_string()
    }
}

/// Check that `id` can key state records.
///
/// Record files are named `<runId>-<stepId>.json`, so a run id must be
/// non-empty and may only contain ASCII letters, digits, `_` and `.`. A `-`
/// would make one run's records indistinguishable from another's.
pub fn validate_run_id(id: &str) -> Result<()> {
    let reason = if id.is_empty() {
        Some("must not be empty")
    } else if id.contains('-') {
        Some("must not contain '-'")
    } else if id.starts_with('.') {
        Some("must not start with '.'")
    } else if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        Some("may only contain ASCII letters, digits, '_' and '.'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StagehandError::InvalidRunId {
            run_id: id.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Generator that always returns the same id.
#[derive(Debug, Clone)]
pub struct FixedRunId(pub String);

impl RunIdGenerator for FixedRunId {
    fn generate(&self) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_generation() {
        let id1 = RunId::new();
        let id2 = RunId::new();

        assert_ne!(id1, id2);
        assert!(id1.to_string().starts_with("run_"));
    }

    #[test]
    fn run_id_from_string() {
        let id = RunId::new();
        let parsed = RunId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn run_id_timestamp_extraction() {
        let id = RunId::new();
        let now = Utc::now();
        assert!(now.signed_duration_since(id.timestamp()).num_seconds() < 2);
    }

    #[test]
    fn run_id_has_no_dashes() {
        // Record file names are `<runId>-<stepId>.json`.
        assert!(!RunId::new().to_string().contains('-'));
    }

    #[test]
    fn run_id_parse_invalid() {
        assert!(RunId::parse("invalid").is_none());
        assert!(RunId::parse("run_").is_none());
        assert!(RunId::parse("run_123").is_none());
        assert!(RunId::parse("run_abc_xyz").is_none());
        assert!(RunId::parse("run_123_abcd").is_none());
    }

    #[test]
    fn fixed_generator_is_stable() {
        let generator = FixedRunId("run_under_test".to_string());
        assert_eq!(generator.generate(), generator.generate());
    }

    #[test]
    fn generated_ids_are_valid() {
        validate_run_id(&RunId::new().to_string()).unwrap();
        validate_run_id("nightly.2024_01").unwrap();
    }

    #[test]
    fn rejects_ids_that_collide_in_file_names() {
        for bad in ["", "job-2", "../up", "a/b", ".hidden", "run 1"] {
            assert!(
                matches!(
                    validate_run_id(bad),
                    Err(StagehandError::InvalidRunId { .. })
                ),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn timestamp_generator_output_parses() {
        let id = TimestampRunId.generate();
        assert!(RunId::parse(&id).is_some());
    }
}
