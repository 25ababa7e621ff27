//! Step definitions.

use std::fmt;

use crate::context::ExecutionContext;

use super::hooks::{StepErrorEvent, StepEvent, StepHooks};

type StepBody<D> = Box<dyn Fn(&mut ExecutionContext<D>) -> anyhow::Result<()>>;

/// A named unit of work with declared dependencies.
///
/// Steps are built once and never mutated by the runner.
///
/// # Example
///
/// ```
/// use stagehand::context::ExecutionContext;
/// use stagehand::runner::Step;
///
/// let step: Step<Vec<String>> = Step::new("parse", |ctx: &mut ExecutionContext<Vec<String>>| {
///     ctx.data.push("parsed".to_string());
///     Ok(())
/// })
/// .depends_on(["fetch"]);
///
/// assert_eq!(step.dependencies(), ["fetch"]);
/// ```
pub struct Step<D> {
    id: String,
    dependencies: Vec<String>,
    body: StepBody<D>,
    hooks: StepHooks<D>,
}

impl<D> Step<D> {
    /// Create a step with no dependencies.
    pub fn new(
        id: impl Into<String>,
        body: impl Fn(&mut ExecutionContext<D>) -> anyhow::Result<()> + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            dependencies: Vec::new(),
            body: Box::new(body),
            hooks: StepHooks::default(),
        }
    }

    /// Declare steps that must run before this one.
    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    /// Hook fired before the body runs.
    pub fn before(
        mut self,
        hook: impl Fn(&StepEvent<'_, D>) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.hooks.before = Some(Box::new(hook));
        self
    }

    /// Hook fired after the body succeeds.
    pub fn after(
        mut self,
        hook: impl Fn(&StepEvent<'_, D>) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.hooks.after = Some(Box::new(hook));
        self
    }

    /// Hook fired when the body fails.
    pub fn on_error(
        mut self,
        hook: impl Fn(&StepErrorEvent<'_, D>) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.hooks.on_error = Some(Box::new(hook));
        self
    }

    /// The step id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Declared dependencies.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// The step's own hooks.
    pub fn hooks(&self) -> &StepHooks<D> {
        &self.hooks
    }

    pub(crate) fn execute(&self, context: &mut ExecutionContext<D>) -> anyhow::Result<()> {
        (self.body)(context)
    }
}

impl<D> fmt::Debug for Step<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("dependencies", &self.dependencies)
            .field("hooks", &!self.hooks.is_empty())
            .finish()
    }
}
