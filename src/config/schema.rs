//! Configuration schema definitions for Stagehand.
//!
//! This module contains the struct definitions that map to the YAML
//! configuration file format, plus the per-run configuration the engine
//! carries in every [`ExecutionContext`](crate::context::ExecutionContext).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Execution mode. Gates safety caps and persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl Mode {
    /// Whether this is production mode.
    pub fn is_production(&self) -> bool {
        matches!(self, Mode::Production)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Development => "development",
            Mode::Production => "production",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Mode::Development),
            "production" | "prod" => Ok(Mode::Production),
            other => Err(format!(
                "unknown mode '{}' (expected development or production)",
                other
            )),
        }
    }
}

/// Request budget for fetchers. The engine itself never consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Requests allowed per interval.
    pub requests: u32,
    /// Interval length in milliseconds.
    pub interval_ms: u64,
}

impl RateLimit {
    /// Interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Immutable configuration of a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Development or production.
    pub mode: Mode,

    /// Pacing delay between iteration ticks.
    #[serde(rename = "delay_ms", with = "duration_ms")]
    pub delay: Duration,

    /// Safety cap on iterations outside production mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,

    /// Request budget handed to fetchers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimit>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Development,
            delay: Duration::from_millis(1000),
            max_items: None,
            rate_limit: None,
        }
    }
}

impl RunConfig {
    /// Apply call-time overrides on top of this config.
    pub fn merged(&self, overrides: &RunOverrides) -> Self {
        Self {
            mode: overrides.mode.unwrap_or(self.mode),
            delay: overrides.delay.unwrap_or(self.delay),
            max_items: overrides.max_items.or(self.max_items),
            rate_limit: self.rate_limit,
        }
    }
}

/// Call-time overrides for a run or resume.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOverrides {
    pub mode: Option<Mode>,
    pub delay: Option<Duration>,
    pub max_items: Option<usize>,
}

/// When a state store writes to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistPolicy {
    /// Persist in every mode.
    Always,
    /// Persist only in production mode; elsewhere writes are no-ops.
    #[default]
    ProductionOnly,
}

impl PersistPolicy {
    /// Whether writes are persisted in the given mode.
    pub fn persists_in(&self, mode: Mode) -> bool {
        match self {
            PersistPolicy::Always => true,
            PersistPolicy::ProductionOnly => mode.is_production(),
        }
    }
}

/// Root configuration structure for `.stagehand/config.yml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding `<runId>-<stepId>.json` records.
    pub state_dir: PathBuf,

    /// When state is written to disk.
    pub persist: PersistPolicy,

    /// Base run configuration.
    pub run: RunConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".stagehand/state"),
            persist: PersistPolicy::default(),
            run: RunConfig::default(),
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
