//! Bounded, paced iteration with per-item failure isolation.
//!
//! The loop is strictly sequential: an item callback always finishes before
//! the pacing delay starts, and the next tick only fires after the delay.
//! Ticks never overlap.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{Mode, RunConfig};
use crate::state::StepProgress;

use super::stop::StopHandle;

/// Iteration bound used outside production mode when `max_items` is unset.
pub const DEFAULT_SAFETY_CAP: usize = 5;

type ItemFn<'a, T> = Box<dyn FnMut(usize, &T) -> anyhow::Result<()> + 'a>;
type CompleteFn<'a, T> = Box<dyn FnMut(&[T]) -> anyhow::Result<()> + 'a>;
type PositionFn<'a> = Box<dyn Fn() -> anyhow::Result<usize> + 'a>;
type PersistFn<'a> = Box<dyn FnMut(usize) -> anyhow::Result<()> + 'a>;
type FailureFn<'a, T> = Box<dyn FnMut(&LoopFailure<T>) -> anyhow::Result<()> + 'a>;
type ProgressFn<'a> = Box<dyn FnMut(&LoopProgress) + 'a>;

/// A captured item failure. Never raised; the loop moves on.
#[derive(Debug)]
pub struct LoopFailure<T> {
    pub index: usize,
    pub error: anyhow::Error,
    pub item: T,
    pub timestamp: DateTime<Utc>,
}

/// Progress report emitted after each successful item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopProgress {
    pub index: usize,
    pub bound: usize,
    /// Estimated time left at the current pacing delay.
    pub remaining: Duration,
}

/// How a loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// Every index up to the bound was visited.
    Completed { processed: usize, failed: usize },
    /// `stop()` was called before the bound was reached.
    Stopped { at: usize },
}

/// Drives an item callback over `items[start..=bound]` at a fixed pace.
///
/// A bound of `n` visits indices `0..=n`. It is clamped to the last item,
/// and outside production mode to `cap` where `cap` is `max_items` or
/// [`DEFAULT_SAFETY_CAP`]. The cap limits the bound itself, so a resumed
/// pass never reaches further than a fresh one.
pub struct IterationController<'a, T> {
    items: Vec<T>,
    bound: Option<usize>,
    delay: Duration,
    mode: Mode,
    max_items: Option<usize>,
    on_item: ItemFn<'a, T>,
    on_complete: Option<CompleteFn<'a, T>>,
    position: Option<PositionFn<'a>>,
    persist: Option<PersistFn<'a>>,
    on_failure: Option<FailureFn<'a, T>>,
    on_progress: Option<ProgressFn<'a>>,
    failures: Vec<LoopFailure<T>>,
    stop: StopHandle,
}

impl<'a, T: Clone> IterationController<'a, T> {
    /// Create a controller over `items`.
    ///
    /// Defaults: bound = last item, no delay, development mode.
    pub fn new(
        items: Vec<T>,
        on_item: impl FnMut(usize, &T) -> anyhow::Result<()> + 'a,
    ) -> Self {
        Self {
            items,
            bound: None,
            delay: Duration::ZERO,
            mode: Mode::Development,
            max_items: None,
            on_item: Box::new(on_item),
            on_complete: None,
            position: None,
            persist: None,
            on_failure: None,
            on_progress: None,
            failures: Vec::new(),
            stop: StopHandle::new(),
        }
    }

    /// Take mode, delay and safety cap from a run configuration.
    pub fn config(mut self, config: &RunConfig) -> Self {
        self.mode = config.mode;
        self.delay = config.delay;
        self.max_items = config.max_items;
        self
    }

    /// Set the last index to visit.
    pub fn bound(mut self, bound: usize) -> Self {
        self.bound = Some(bound);
        self
    }

    /// Set the pacing delay between ticks.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the execution mode.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the safety cap used outside production mode.
    pub fn max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    /// Callback invoked once with the full item list when the loop completes.
    pub fn on_complete(mut self, f: impl FnMut(&[T]) -> anyhow::Result<()> + 'a) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Accessor for a persisted position to resume from.
    pub fn resume_from(mut self, f: impl Fn() -> anyhow::Result<usize> + 'a) -> Self {
        self.position = Some(Box::new(f));
        self
    }

    /// Callback persisting the next index after each success, and zero on completion.
    pub fn persist_with(mut self, f: impl FnMut(usize) -> anyhow::Result<()> + 'a) -> Self {
        self.persist = Some(Box::new(f));
        self
    }

    /// Callback invoked for every captured failure.
    pub fn on_failure(
        mut self,
        f: impl FnMut(&LoopFailure<T>) -> anyhow::Result<()> + 'a,
    ) -> Self {
        self.on_failure = Some(Box::new(f));
        self
    }

    /// Callback receiving progress after each success.
    pub fn on_progress(mut self, f: impl FnMut(&LoopProgress) + 'a) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Resume from, persist to and record failures in a step's state record.
    pub fn track(self, progress: StepProgress) -> Self {
        let position = progress.clone();
        let persist = progress.clone();
        let failures = progress;
        self.resume_from(move || Ok(position.position()?))
            .persist_with(move |index| Ok(persist.persist(index)?))
            .on_failure(move |failure| Ok(failures.record_failure(failure.index)?))
    }

    /// Use an existing stop handle, e.g. one shared with a signal handler
    /// or with the item callback itself.
    pub fn stop_with(mut self, handle: StopHandle) -> Self {
        self.stop = handle;
        self
    }

    /// Handle that stops the loop from a callback or another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Stop ticking. A running loop returns before its next tick.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Failures captured so far.
    pub fn failures(&self) -> &[LoopFailure<T>] {
        &self.failures
    }

    /// Indices of captured failures, for a later retry pass.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.index).collect()
    }

    /// Forget captured failures.
    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    /// The items this controller iterates.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// First index and last index of this pass, or `None` if there is nothing to visit.
    fn window(&self) -> anyhow::Result<(usize, Option<usize>)> {
        let start = match &self.position {
            Some(position) => position()?,
            None => 0,
        };

        let Some(last) = self.items.len().checked_sub(1) else {
            return Ok((start, None));
        };

        let mut end = self.bound.map_or(last, |b| b.min(last));
        if !self.mode.is_production() {
            end = end.min(self.max_items.unwrap_or(DEFAULT_SAFETY_CAP));
        }

        if start > end {
            return Ok((start, None));
        }
        Ok((start, Some(end)))
    }

    /// Run the loop to completion or until stopped.
    ///
    /// Item failures are captured; errors from the position, persist,
    /// failure or completion callbacks abort the loop.
    pub fn run(&mut self) -> anyhow::Result<LoopOutcome> {
        let (start, end) = self.window()?;
        let mut processed = 0;
        let mut failed = 0;

        if start > 0 {
            info!("Resuming iteration at index {}", start);
        }

        if let Some(end) = end {
            for index in start..=end {
                if self.stop.is_stopped() {
                    info!("Iteration stopped at index {}", index);
                    return Ok(LoopOutcome::Stopped { at: index });
                }

                processed += 1;
                match (self.on_item)(index, &self.items[index]) {
                    Ok(()) => {
                        if let Some(persist) = self.persist.as_mut() {
                            persist(index + 1)?;
                        }
                        let progress = LoopProgress {
                            index,
                            bound: end,
                            remaining: self.delay.saturating_mul((end - index) as u32),
                        };
                        debug!(
                            "Processed item {}/{} (~{}s remaining)",
                            index,
                            end,
                            progress.remaining.as_secs()
                        );
                        if let Some(report) = self.on_progress.as_mut() {
                            report(&progress);
                        }
                    }
                    Err(error) => {
                        warn!("Item {} failed: {:#}", index, error);
                        failed += 1;
                        let failure = LoopFailure {
                            index,
                            error,
                            item: self.items[index].clone(),
                            timestamp: Utc::now(),
                        };
                        if let Some(on_failure) = self.on_failure.as_mut() {
                            on_failure(&failure)?;
                        }
                        self.failures.push(failure);
                    }
                }

                if index < end && self.stop.sleep(self.delay) {
                    info!("Iteration stopped after index {}", index);
                    return Ok(LoopOutcome::Stopped { at: index + 1 });
                }
            }
        }

        if let Some(persist) = self.persist.as_mut() {
            persist(0)?;
        }
        if let Some(on_complete) = self.on_complete.as_mut() {
            on_complete(&self.items)?;
        }

        info!(
            "Iteration complete: {} processed, {} failed",
            processed, failed
        );
        Ok(LoopOutcome::Completed { processed, failed })
    }
}
