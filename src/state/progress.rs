//! Binding of one step's state record to an iteration loop.

use crate::error::Result;

use super::store::StateStore;

/// A step's view of the state store, used to resume and checkpoint loops.
#[derive(Debug, Clone)]
pub struct StepProgress {
    store: StateStore,
    step: String,
}

impl StepProgress {
    /// Track progress of `step` in `store`.
    pub fn new(store: StateStore, step: impl Into<String>) -> Self {
        Self {
            store,
            step: step.into(),
        }
    }

    /// The tracked step.
    pub fn step(&self) -> &str {
        &self.step
    }

    /// Persisted position of the step; zero when not in progress.
    pub fn position(&self) -> Result<usize> {
        Ok(self.store.get_record(&self.step)?.index as usize)
    }

    /// Persist the next index to process.
    pub fn persist(&self, index: usize) -> Result<()> {
        self.store.set_progress(&self.step, index as u64)
    }

    /// Record a failed item index.
    pub fn record_failure(&self, index: usize) -> Result<()> {
        self.store.record_failure(&self.step, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Mode, PersistPolicy};
    use crate::state::FailureMarker;
    use tempfile::TempDir;

    #[test]
    fn progress_round_trips_through_store() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path(), "run_1", Mode::Production, PersistPolicy::Always)
            .unwrap();
        let progress = StepProgress::new(store.clone(), "pages");

        assert_eq!(progress.position().unwrap(), 0);
        progress.persist(4).unwrap();
        progress.record_failure(2).unwrap();

        assert_eq!(progress.position().unwrap(), 4);
        assert_eq!(
            store.get_record("pages").unwrap().fails,
            vec![FailureMarker::Index(2)]
        );
    }
}
