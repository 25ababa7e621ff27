//! Persistent per-run, per-step state storage.
//!
//! Each (run, step) pair is stored as `<state_dir>/<runId>-<stepId>.json`.
//! Run ids never contain `-`, so the name splits unambiguously at its first
//! dash. A file is read as one of a run's records only if that split yields
//! the run id and the record's own `stepId`.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::{EngineConfig, Mode, PersistPolicy};
use crate::context::validate_run_id;
use crate::error::{Result, StagehandError};

use super::record::{FailureMarker, StepLogRecord};
use super::resume::ResumeState;

const RECORD_EXTENSION: &str = "json";

/// Durable store of step progress for one run.
///
/// Outside the modes its [`PersistPolicy`] allows, every write is accepted
/// as a no-op and every read returns defaults.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
    run_id: String,
    mode: Mode,
    policy: PersistPolicy,
}

/// Summary of one run's records in a state directory.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: String,
    pub step_count: usize,
    pub last_updated: DateTime<Utc>,
}

impl StateStore {
    /// Create a store for `run_id` in `dir`.
    ///
    /// Fails with [`StagehandError::InvalidRunId`] if `run_id` cannot key
    /// record file names.
    pub fn new(
        dir: impl Into<PathBuf>,
        run_id: impl Into<String>,
        mode: Mode,
        policy: PersistPolicy,
    ) -> Result<Self> {
        let run_id = run_id.into();
        validate_run_id(&run_id)?;
        Ok(Self {
            dir: dir.into(),
            run_id,
            mode,
            policy,
        })
    }

    /// Create a store from the engine configuration.
    pub fn from_config(config: &EngineConfig, run_id: impl Into<String>) -> Result<Self> {
        Self::new(
            config.state_dir.clone(),
            run_id,
            config.run.mode,
            config.persist,
        )
    }

    /// Whether writes reach the disk.
    pub fn active(&self) -> bool {
        self.policy.persists_in(self.mode)
    }

    /// The run this store belongs to.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// The state directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, step: &str) -> Result<PathBuf> {
        validate_step_id(step)?;
        Ok(self
            .dir
            .join(format!("{}-{}.{}", self.run_id, step, RECORD_EXTENSION)))
    }

    /// Step id `path` would hold if it were a record of this run.
    fn own_step<'p>(&self, path: &'p Path) -> Option<&'p str> {
        split_record_name(path)
            .filter(|(run_id, _)| *run_id == self.run_id)
            .map(|(_, step)| step)
    }

    /// Load a record; missing or malformed files read as `None`.
    fn load(&self, step: &str) -> Result<Option<StepLogRecord>> {
        read_record(&self.record_path(step)?)
    }

    /// Save a record using write-to-temp-then-rename.
    fn save(&self, record: &StepLogRecord) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let path = self.record_path(&record.step_id)?;
        let content = serde_json::to_string_pretty(record).map_err(anyhow::Error::from)?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &path)?;

        debug!(
            run = %self.run_id,
            step = %record.step_id,
            index = record.index,
            fails = record.fails.len(),
            "Saved step record"
        );
        Ok(())
    }

    fn update(&self, step: &str, apply: impl FnOnce(&mut StepLogRecord)) -> Result<()> {
        validate_step_id(step)?;
        if !self.active() {
            return Ok(());
        }
        let mut record = self
            .load(step)?
            .unwrap_or_else(|| StepLogRecord::new(step));
        apply(&mut record);
        self.save(&record)
    }

    /// Set a step's progress marker. Zero also clears recorded failures.
    pub fn set_progress(&self, step: &str, index: u64) -> Result<()> {
        self.update(step, |record| record.set_index(index))
    }

    /// Append a failure marker to a step's record.
    pub fn record_failure(&self, step: &str, marker: impl Into<FailureMarker>) -> Result<()> {
        let marker = marker.into();
        self.update(step, |record| record.push_failure(marker))
    }

    /// Shallow-merge `payload` into a step's stored payload.
    pub fn set_payload(&self, step: &str, payload: Map<String, Value>) -> Result<()> {
        self.update(step, |record| record.merge_payload(payload))
    }

    /// Get a step's record, or a fresh default if none exists.
    pub fn get_record(&self, step: &str) -> Result<StepLogRecord> {
        validate_step_id(step)?;
        if !self.active() {
            return Ok(StepLogRecord::new(step));
        }
        Ok(self
            .load(step)?
            .unwrap_or_else(|| StepLogRecord::new(step)))
    }

    /// Every record of this run, ordered by `updated_at` ascending.
    pub fn get_all_records(&self) -> Result<Vec<StepLogRecord>> {
        if !self.active() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for path in record_files(&self.dir)? {
            let Some(step) = self.own_step(&path) else {
                continue;
            };
            match read_record(&path)? {
                Some(record) if record.step_id == step => records.push(record),
                Some(record) => {
                    warn!(
                        "Ignoring {}: holds step '{}'",
                        path.display(),
                        record.step_id
                    );
                }
                None => {}
            }
        }

        records.sort_by(|a, b| {
            a.updated_at
                .cmp(&b.updated_at)
                .then_with(|| a.step_id.cmp(&b.step_id))
        });
        Ok(records)
    }

    /// Derive a resume point from this run's records.
    pub fn build_resume_state(&self, explicit_step: Option<&str>) -> Result<ResumeState> {
        let records = self.get_all_records()?;
        Ok(ResumeState::from_records(
            self.run_id.clone(),
            &records,
            explicit_step,
        ))
    }

    /// Delete one step's record.
    pub fn clear_step(&self, step: &str) -> Result<()> {
        validate_step_id(step)?;
        if !self.active() {
            return Ok(());
        }
        remove_if_exists(&self.record_path(step)?)
    }

    /// Delete every record of this run. Returns the number of files removed.
    pub fn clear_run(&self) -> Result<usize> {
        if !self.active() {
            return Ok(0);
        }

        let mut removed = 0;
        for path in record_files(&self.dir)? {
            let Some(step) = self.own_step(&path) else {
                continue;
            };
            // A record naming another step was not written for this run.
            let foreign = read_record(&path)?.is_some_and(|r| r.step_id != step);
            if !foreign {
                remove_if_exists(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Runs with records in `dir`, most recently updated first.
    ///
    /// Run ids are taken from the file name up to the first `-`.
    pub fn list_runs(dir: &Path) -> Result<Vec<RunSummary>> {
        let mut runs: BTreeMap<String, RunSummary> = BTreeMap::new();

        for path in record_files(dir)? {
            let Some((run_id, step)) = split_record_name(&path) else {
                continue;
            };
            let Some(record) = read_record(&path)? else {
                continue;
            };
            if record.step_id != step {
                continue;
            }

            let entry = runs.entry(run_id.to_string()).or_insert_with(|| RunSummary {
                run_id: run_id.to_string(),
                step_count: 0,
                last_updated: record.updated_at,
            });
            entry.step_count += 1;
            entry.last_updated = entry.last_updated.max(record.updated_at);
        }

        let mut runs: Vec<RunSummary> = runs.into_values().collect();
        runs.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(runs)
    }
}

/// Split a record file name into run id and step id at the first `-`.
///
/// Valid run ids never contain `-`. A file whose stored step id differs from
/// the name's step part was written under a different split and is skipped
/// by callers.
fn split_record_name(path: &Path) -> Option<(&str, &str)> {
    let stem = path.file_stem()?.to_str()?;
    let (run_id, step) = stem.split_once('-')?;
    (!run_id.is_empty() && !step.is_empty()).then_some((run_id, step))
}

/// Step ids become part of a file name inside the state directory.
fn validate_step_id(step: &str) -> Result<()> {
    let reason = if step.is_empty() {
        Some("must not be empty")
    } else if step == "." || step == ".." {
        Some("must not be a relative path component")
    } else if step.contains(['/', '\\', '\0']) {
        Some("must not contain path separators")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StagehandError::InvalidStepId {
            step: step.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// `.json` files directly inside `dir`; a missing directory yields none.
fn record_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == RECORD_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read a record file. Absent and malformed files both read as `None`;
/// any other I/O error propagates.
fn read_record(path: &Path) -> Result<Option<StepLogRecord>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_str(&content) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            warn!("Ignoring malformed state record {}: {}", path.display(), e);
            Ok(None)
        }
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
