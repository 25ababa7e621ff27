//! A sink that writes buffered values to a JSON file.

use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::{Mode, PersistPolicy};
use crate::context::ExecutionContext;

use super::Sink;

/// Buffers values and writes them as a pretty JSON array on flush.
///
/// Each flush rewrites the whole file with everything written so far.
#[derive(Debug)]
pub struct JsonFileSink {
    path: PathBuf,
    mode: Mode,
    policy: PersistPolicy,
    items: Vec<Value>,
}

impl JsonFileSink {
    /// Create a sink for `path` that persists under `policy` in `mode`.
    pub fn new(path: impl Into<PathBuf>, mode: Mode, policy: PersistPolicy) -> Self {
        Self {
            path: path.into(),
            mode,
            policy,
            items: Vec::new(),
        }
    }

    /// Serialize and buffer any value.
    pub fn push<T: Serialize>(&mut self, item: &T) -> anyhow::Result<()> {
        self.items.push(serde_json::to_value(item)?);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Values buffered so far.
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<D> Sink<D> for JsonFileSink {
    type Item = Value;

    fn write(&mut self, item: Value, _context: &ExecutionContext<D>) -> anyhow::Result<()> {
        self.items.push(item);
        Ok(())
    }

    fn flush(&mut self, context: &ExecutionContext<D>) -> anyhow::Result<()> {
        if !self.policy.persists_in(self.mode) {
            debug!(
                run = context.run_id(),
                path = %self.path.display(),
                "Skipping sink flush outside production"
            );
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(&self.items)?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &self.path)?;

        debug!(
            run = context.run_id(),
            path = %self.path.display(),
            items = self.items.len(),
            "Flushed sink"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use serde_json::json;
    use tempfile::TempDir;

    fn context() -> ExecutionContext<()> {
        ExecutionContext::new("run_1", RunConfig::default(), ())
    }

    #[test]
    fn flush_writes_pretty_array() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out").join("items.json");
        let mut sink = JsonFileSink::new(&path, Mode::Production, PersistPolicy::ProductionOnly);
        let ctx = context();

        sink.write(json!({"id": 1}), &ctx).unwrap();
        sink.push(&vec!["a", "b"]).unwrap();
        sink.flush(&ctx).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, json!([{"id": 1}, ["a", "b"]]));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn flush_is_skipped_in_development() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("items.json");
        let mut sink = JsonFileSink::new(&path, Mode::Development, PersistPolicy::ProductionOnly);
        let ctx = context();

        sink.write(json!(1), &ctx).unwrap();
        sink.flush(&ctx).unwrap();

        assert!(!path.exists());
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn always_policy_flushes_in_development() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("items.json");
        let mut sink = JsonFileSink::new(&path, Mode::Development, PersistPolicy::Always);

        sink.flush(&context()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
    }
}
