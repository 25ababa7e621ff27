//! Lifecycle hooks fired around each step.
//!
//! Runner-level observers and a step's own hooks form one ordered list:
//! runner observers in registration order, then the step's hooks. Every
//! event is delivered in that order, on success and failure paths alike.

use crate::context::ExecutionContext;

use super::step::Step;

type HookFn<D> = Box<dyn Fn(&StepEvent<'_, D>) -> anyhow::Result<()>>;
type ErrorHookFn<D> = Box<dyn Fn(&StepErrorEvent<'_, D>) -> anyhow::Result<()>>;

/// A step is about to run or has just finished.
pub struct StepEvent<'a, D> {
    pub step: &'a Step<D>,
    pub context: &'a ExecutionContext<D>,
    /// Zero-based position in the resolved order.
    pub index: usize,
    pub total: usize,
}

/// A step body failed.
pub struct StepErrorEvent<'a, D> {
    pub step: &'a Step<D>,
    pub context: &'a ExecutionContext<D>,
    pub index: usize,
    pub total: usize,
    pub error: &'a anyhow::Error,
}

/// Observer of step lifecycle events.
///
/// A hook returning an error aborts the run; hooks are observers, not
/// recovery points.
pub trait StepObserver<D> {
    fn before_step(&self, _event: &StepEvent<'_, D>) -> anyhow::Result<()> {
        Ok(())
    }

    fn after_step(&self, _event: &StepEvent<'_, D>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_error(&self, _event: &StepErrorEvent<'_, D>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Hooks attached to a single step.
pub struct StepHooks<D> {
    pub(crate) before: Option<HookFn<D>>,
    pub(crate) after: Option<HookFn<D>>,
    pub(crate) on_error: Option<ErrorHookFn<D>>,
}

impl<D> Default for StepHooks<D> {
    fn default() -> Self {
        Self {
            before: None,
            after: None,
            on_error: None,
        }
    }
}

impl<D> StepHooks<D> {
    /// Whether no hook is set.
    pub fn is_empty(&self) -> bool {
        self.before.is_none() && self.after.is_none() && self.on_error.is_none()
    }
}

impl<D> StepObserver<D> for StepHooks<D> {
    fn before_step(&self, event: &StepEvent<'_, D>) -> anyhow::Result<()> {
        match &self.before {
            Some(hook) => hook(event),
            None => Ok(()),
        }
    }

    fn after_step(&self, event: &StepEvent<'_, D>) -> anyhow::Result<()> {
        match &self.after {
            Some(hook) => hook(event),
            None => Ok(()),
        }
    }

    fn on_error(&self, event: &StepErrorEvent<'_, D>) -> anyhow::Result<()> {
        match &self.on_error {
            Some(hook) => hook(event),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn empty_hooks_are_no_ops() {
        let hooks: StepHooks<()> = StepHooks::default();
        assert!(hooks.is_empty());

        let step = Step::new("a", |_| Ok(()));
        let ctx = ExecutionContext::new("run_1", RunConfig::default(), ());
        let event = StepEvent {
            step: &step,
            context: &ctx,
            index: 0,
            total: 1,
        };
        assert!(hooks.before_step(&event).is_ok());
        assert!(hooks.after_step(&event).is_ok());
    }

    #[test]
    fn step_hooks_receive_event() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let step: Step<()> = Step::new("a", |_| Ok(())).before(move |event| {
            log.borrow_mut()
                .push(format!("{}:{}/{}", event.step.id(), event.index, event.total));
            Ok(())
        });

        let ctx = ExecutionContext::new("run_1", RunConfig::default(), ());
        let event = StepEvent {
            step: &step,
            context: &ctx,
            index: 2,
            total: 3,
        };
        step.hooks().before_step(&event).unwrap();
        assert_eq!(*seen.borrow(), vec!["a:2/3"]);
    }
}
