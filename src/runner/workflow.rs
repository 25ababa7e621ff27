//! Pipeline execution orchestration.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::{RunConfig, RunOverrides};
use crate::context::{
    validate_run_id, ExecutionContext, RunIdGenerator, SharedData, TimestampRunId,
};
use crate::error::{HookPhase, Result, StagehandError};
use crate::state::ResumeState;

use super::dependency::DependencyGraph;
use super::hooks::{StepErrorEvent, StepEvent, StepObserver};
use super::step::Step;

/// Options for a run or resume.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Use this run id instead of generating one.
    pub run_id: Option<String>,
    /// Overrides merged onto the runner's base configuration.
    pub overrides: RunOverrides,
}

/// Result of running a pipeline.
#[derive(Debug)]
pub struct RunResult<D> {
    pub run_id: String,
    /// Number of steps in the resolved order.
    pub total_steps: usize,
    /// Steps that finished, in execution order.
    pub completed_steps: Vec<String>,
    /// Steps whose body failed. A failure aborts the run, so a returned
    /// result never lists any.
    pub failed_steps: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Shared data as left by the last step.
    pub data: D,
}

/// Executes a set of steps in dependency order, one at a time.
pub struct Runner<D> {
    steps: Vec<Step<D>>,
    config: RunConfig,
    observers: Vec<Box<dyn StepObserver<D>>>,
    ids: Box<dyn RunIdGenerator>,
}

impl<D: SharedData> Runner<D> {
    /// Create a runner over `steps` with a base configuration.
    pub fn new(steps: Vec<Step<D>>, config: RunConfig) -> Self {
        Self {
            steps,
            config,
            observers: Vec::new(),
            ids: Box::new(TimestampRunId),
        }
    }

    /// Register a runner-level observer. Observers fire in registration
    /// order, before any step-level hook.
    pub fn with_observer(mut self, observer: impl StepObserver<D> + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Replace the run id generator.
    pub fn with_id_generator(mut self, ids: impl RunIdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// The steps as supplied.
    pub fn steps(&self) -> &[Step<D>] {
        &self.steps
    }

    /// The base configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Resolve the execution order.
    pub fn order(&self) -> Result<Vec<&Step<D>>> {
        let graph = self
            .steps
            .iter()
            .fold(DependencyGraph::builder(), |builder, step| {
                builder.add_step(step.id(), step.dependencies().iter().cloned())
            })
            .build()?;

        let by_id: HashMap<&str, &Step<D>> = self.steps.iter().map(|s| (s.id(), s)).collect();

        graph
            .topological_order()?
            .iter()
            .map(|id| {
                by_id
                    .get(id.as_str())
                    .copied()
                    .ok_or_else(|| StagehandError::UnknownStep { step: id.clone() })
            })
            .collect()
    }

    /// Build the execution context for a run.
    ///
    /// An explicit run id must be usable in record file names.
    pub fn context(&self, data: D, options: &RunOptions) -> Result<ExecutionContext<D>> {
        let run_id = match &options.run_id {
            Some(id) => {
                validate_run_id(id)?;
                id.clone()
            }
            None => self.ids.generate(),
        };
        Ok(ExecutionContext::new(
            run_id,
            self.config.merged(&options.overrides),
            data,
        ))
    }

    /// Run every step from the first.
    pub fn run(&self, data: D, options: RunOptions) -> Result<RunResult<D>> {
        let context = self.context(data, &options)?;
        let order = self.order()?;
        self.execute(&order, context, 0)
    }

    /// Continue a run from a resume point.
    ///
    /// Execution starts at `state.current_step_id` when it is set, otherwise
    /// at position `state.step_index` of the resolved order. Shared data is
    /// seeded from the resume payload first.
    pub fn resume(
        &self,
        mut data: D,
        state: &ResumeState,
        options: RunOptions,
    ) -> Result<RunResult<D>> {
        data.seed(&state.payload)?;

        let mut options = options;
        if options.run_id.is_none() && !state.run_id.is_empty() {
            options.run_id = Some(state.run_id.clone());
        }
        let context = self.context(data, &options)?;

        let order = self.order()?;
        let total = order.len();

        let start = if state.current_step_id.is_empty() {
            state.step_index as usize
        } else {
            order
                .iter()
                .position(|s| s.id() == state.current_step_id)
                .ok_or_else(|| StagehandError::UnknownStep {
                    step: state.current_step_id.clone(),
                })?
        };

        if start >= total {
            return Err(StagehandError::InvalidStepIndex {
                index: start,
                total,
            });
        }

        info!(
            "Resuming run {} at step {}/{}",
            context.run_id(),
            start + 1,
            total
        );
        self.execute(&order, context, start)
    }

    fn observers_for<'s>(&'s self, step: &'s Step<D>) -> Vec<&'s dyn StepObserver<D>> {
        self.observers
            .iter()
            .map(|o| o.as_ref())
            .chain(std::iter::once(step.hooks() as &dyn StepObserver<D>))
            .collect()
    }

    fn execute(
        &self,
        order: &[&Step<D>],
        mut context: ExecutionContext<D>,
        start: usize,
    ) -> Result<RunResult<D>> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let total = order.len();
        let mut completed_steps = Vec::new();

        info!(
            "Starting run {} ({} steps, {} mode)",
            context.run_id(),
            total,
            context.config().mode
        );

        for (index, step) in order.iter().copied().enumerate().skip(start) {
            let observers = self.observers_for(step);

            {
                let event = StepEvent {
                    step,
                    context: &context,
                    index,
                    total,
                };
                for observer in &observers {
                    observer
                        .before_step(&event)
                        .map_err(|source| hook_error(step, HookPhase::BeforeStep, source))?;
                }
            }

            debug!("[{}/{}] Running step '{}'", index + 1, total, step.id());
            let step_clock = Instant::now();

            match step.execute(&mut context) {
                Ok(()) => {
                    debug!(
                        "Step '{}' finished in {}ms",
                        step.id(),
                        step_clock.elapsed().as_millis()
                    );
                    let event = StepEvent {
                        step,
                        context: &context,
                        index,
                        total,
                    };
                    for observer in &observers {
                        observer
                            .after_step(&event)
                            .map_err(|source| hook_error(step, HookPhase::AfterStep, source))?;
                    }
                    completed_steps.push(step.id().to_string());
                }
                Err(error) => {
                    warn!("Step '{}' failed: {:#}", step.id(), error);
                    let event = StepErrorEvent {
                        step,
                        context: &context,
                        index,
                        total,
                        error: &error,
                    };
                    for observer in &observers {
                        observer
                            .on_error(&event)
                            .map_err(|source| hook_error(step, HookPhase::OnError, source))?;
                    }
                    return Err(StagehandError::StepExecution {
                        step: step.id().to_string(),
                        index,
                        total,
                        completed_steps,
                        source: error,
                    });
                }
            }
        }

        let finished_at = Utc::now();
        let duration_ms = clock.elapsed().as_millis() as u64;
        info!(
            "Run {} finished: {} steps in {}ms",
            context.run_id(),
            completed_steps.len(),
            duration_ms
        );

        Ok(RunResult {
            run_id: context.run_id().to_string(),
            total_steps: total,
            completed_steps,
            failed_steps: Vec::new(),
            started_at,
            finished_at,
            duration_ms,
            data: context.into_data(),
        })
    }
}

fn hook_error<D>(step: &Step<D>, phase: HookPhase, source: anyhow::Error) -> StagehandError {
    StagehandError::Hook {
        step: step.id().to_string(),
        phase,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::context::FixedRunId;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    fn recording_step(id: &str, deps: &[&str], log: &Log) -> Step<()> {
        let log = Rc::clone(log);
        let name = id.to_string();
        Step::new(id, move |_| {
            log.borrow_mut().push(name.clone());
            Ok(())
        })
        .depends_on(deps.iter().copied())
    }

    struct Recorder(Log);

    impl StepObserver<()> for Recorder {
        fn before_step(&self, event: &StepEvent<'_, ()>) -> anyhow::Result<()> {
            self.0
                .borrow_mut()
                .push(format!("runner:before:{}", event.step.id()));
            Ok(())
        }

        fn on_error(&self, event: &StepErrorEvent<'_, ()>) -> anyhow::Result<()> {
            self.0
                .borrow_mut()
                .push(format!("runner:error:{}:{}", event.step.id(), event.index));
            Ok(())
        }
    }

    #[test]
    fn runs_in_dependency_order() {
        let log: Log = Rc::default();
        let runner = Runner::new(
            vec![
                recording_step("C", &["B"], &log),
                recording_step("A", &[], &log),
                recording_step("B", &["A"], &log),
            ],
            RunConfig::default(),
        );

        let result = runner.run((), RunOptions::default()).unwrap();

        assert_eq!(*log.borrow(), vec!["A", "B", "C"]);
        assert_eq!(result.completed_steps, vec!["A", "B", "C"]);
        assert!(result.failed_steps.is_empty());
        assert_eq!(result.total_steps, 3);
        assert!(result.finished_at >= result.started_at);
    }

    #[test]
    fn cycle_fails_before_any_step_runs() {
        let log: Log = Rc::default();
        let runner = Runner::new(
            vec![
                recording_step("A", &["B"], &log),
                recording_step("B", &["A"], &log),
            ],
            RunConfig::default(),
        );

        let err = runner.run((), RunOptions::default()).unwrap_err();
        assert!(matches!(err, StagehandError::CircularDependency { .. }));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn missing_dependency_fails_before_any_step_runs() {
        let log: Log = Rc::default();
        let runner = Runner::new(
            vec![
                recording_step("A", &[], &log),
                recording_step("B", &["ghost"], &log),
            ],
            RunConfig::default(),
        );

        match runner.run((), RunOptions::default()) {
            Err(StagehandError::MissingDependency { step, dependency }) => {
                assert_eq!(step, "B");
                assert_eq!(dependency, "ghost");
            }
            other => panic!("expected MissingDependency, got {:?}", other.map(|_| ())),
        }
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn failure_fires_runner_then_step_error_hooks() {
        let log: Log = Rc::default();
        let step_log = Rc::clone(&log);
        let failing = Step::<()>::new("B", |_| anyhow::bail!("remote closed"))
            .depends_on(["A"])
            .on_error(move |event| {
                step_log
                    .borrow_mut()
                    .push(format!("step:error:{}:{}/{}", event.step.id(), event.index, event.total));
                assert!(event.error.to_string().contains("remote closed"));
                Ok(())
            });

        let runner = Runner::new(
            vec![
                recording_step("A", &[], &log),
                failing,
                recording_step("C", &["B"], &log),
            ],
            RunConfig::default(),
        )
        .with_observer(Recorder(Rc::clone(&log)));

        let err = runner.run((), RunOptions::default()).unwrap_err();

        assert_eq!(
            *log.borrow(),
            vec![
                "runner:before:A",
                "A",
                "runner:before:B",
                "runner:error:B:1",
                "step:error:B:1/3",
            ]
        );
        match err {
            StagehandError::StepExecution {
                step,
                index,
                completed_steps,
                source,
                ..
            } => {
                assert_eq!(step, "B");
                assert_eq!(index, 1);
                assert_eq!(completed_steps, vec!["A"]);
                assert_eq!(source.to_string(), "remote closed");
            }
            other => panic!("expected StepExecution, got {:?}", other),
        }
    }

    #[test]
    fn failing_before_hook_aborts_run() {
        let log: Log = Rc::default();
        let guarded = recording_step("A", &[], &log).before(|_| anyhow::bail!("not ready"));
        let runner = Runner::new(vec![guarded], RunConfig::default());

        let err = runner.run((), RunOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            StagehandError::Hook {
                phase: HookPhase::BeforeStep,
                ..
            }
        ));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn overrides_reach_context() {
        let seen = Rc::new(RefCell::new(None));
        let capture = Rc::clone(&seen);
        let step = Step::new("inspect", move |ctx: &mut ExecutionContext<()>| {
            *capture.borrow_mut() = Some((ctx.run_id().to_string(), ctx.config().mode));
            Ok(())
        });

        let runner = Runner::new(vec![step], RunConfig::default())
            .with_id_generator(FixedRunId("run_fixed".into()));
        let options = RunOptions {
            overrides: RunOverrides {
                mode: Some(Mode::Production),
                ..Default::default()
            },
            ..Default::default()
        };

        let result = runner.run((), options).unwrap();
        assert_eq!(result.run_id, "run_fixed");
        assert_eq!(
            *seen.borrow(),
            Some(("run_fixed".to_string(), Mode::Production))
        );
    }

    #[test]
    fn resume_starts_at_current_step() {
        let log: Log = Rc::default();
        let runner = Runner::new(
            vec![
                recording_step("A", &[], &log),
                recording_step("B", &["A"], &log),
                recording_step("C", &["B"], &log),
            ],
            RunConfig::default(),
        );

        let state = ResumeState {
            run_id: "run_prev".into(),
            current_step_id: "B".into(),
            step_index: 10,
            ..Default::default()
        };
        let result = runner.resume((), &state, RunOptions::default()).unwrap();

        assert_eq!(*log.borrow(), vec!["B", "C"]);
        assert_eq!(result.completed_steps, vec!["B", "C"]);
        assert_eq!(result.run_id, "run_prev");
    }

    #[test]
    fn resume_by_index_when_no_current_step() {
        let log: Log = Rc::default();
        let runner = Runner::new(
            vec![recording_step("A", &[], &log), recording_step("B", &[], &log)],
            RunConfig::default(),
        );

        let state = ResumeState {
            step_index: 1,
            ..Default::default()
        };
        runner.resume((), &state, RunOptions::default()).unwrap();
        assert_eq!(*log.borrow(), vec!["B"]);
    }

    #[test]
    fn resume_rejects_out_of_range_index() {
        let log: Log = Rc::default();
        let runner = Runner::new(vec![recording_step("A", &[], &log)], RunConfig::default());

        let state = ResumeState {
            step_index: 3,
            ..Default::default()
        };
        let err = runner.resume((), &state, RunOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            StagehandError::InvalidStepIndex { index: 3, total: 1 }
        ));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn resume_rejects_unknown_step() {
        let log: Log = Rc::default();
        let runner = Runner::new(vec![recording_step("A", &[], &log)], RunConfig::default());

        let state = ResumeState {
            current_step_id: "gone".into(),
            ..Default::default()
        };
        let err = runner.resume((), &state, RunOptions::default()).unwrap_err();
        assert!(matches!(err, StagehandError::UnknownStep { .. }));
    }

    #[test]
    fn dashed_run_id_is_rejected_before_any_step() {
        let log: Log = Rc::default();
        let runner = Runner::new(vec![recording_step("A", &[], &log)], RunConfig::default());

        let options = RunOptions {
            run_id: Some("job-2".into()),
            ..Default::default()
        };
        let err = runner.run((), options).unwrap_err();

        assert!(matches!(err, StagehandError::InvalidRunId { .. }));
        assert!(log.borrow().is_empty());
    }
}
