use std::collections::HashMap;
use std::fmt::Debug;
use std::marker::PhantomData;

use crate::retry::RetryPolicy;
use crate::saga::{BoxedStep, Saga};
use crate::step::SagaStep;

/// Marker type for a builder with no steps.
pub struct Empty;

/// Marker type for a builder with at least one step.
pub struct HasSteps;

/// Type-state builder for constructing sagas.
///
/// Steps run in the order they are added. The builder enforces at compile
/// time that a saga has at least one step:
///
/// ```compile_fail
/// use mission_saga::SagaBuilder;
///
/// // Cannot build an empty saga - `build()` is only available after `first_step()`
/// let saga = SagaBuilder::<(), (), _>::new().build();
/// ```
///
/// All steps must share the same context and error types:
///
/// ```compile_fail
/// use mission_saga::{SagaBuilder, SagaStep, SagaStepResult};
///
/// struct StepA;
/// impl SagaStep for StepA {
///     type Context = u32;
///     type Error = ();
///     fn name(&self) -> &'static str { "a" }
///     fn execute(&self, _: &mut u32) -> SagaStepResult<()> {
///         SagaStepResult::success("a")
///     }
/// }
///
/// struct StepB;
/// impl SagaStep for StepB {
///     type Context = String;  // Different context type!
///     type Error = ();
///     fn name(&self) -> &'static str { "b" }
///     fn execute(&self, _: &mut String) -> SagaStepResult<()> {
///         SagaStepResult::success("b")
///     }
/// }
///
/// let saga = SagaBuilder::new()
///     .first_step(StepA)
///     .then(StepB)  // Compile error here!
///     .build();
/// ```
pub struct SagaBuilder<Ctx, Err, State> {
    steps: Vec<BoxedStep<Ctx, Err>>,
    retry_overrides: HashMap<String, RetryPolicy>,
    _phantom: PhantomData<State>,
}

impl<Ctx, Err> SagaBuilder<Ctx, Err, Empty> {
    /// Create a new saga builder in the empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            retry_overrides: HashMap::new(),
            _phantom: PhantomData,
        }
    }

    /// Add the first step to the saga.
    #[must_use]
    pub fn first_step<S>(self, step: S) -> SagaBuilder<Ctx, Err, HasSteps>
    where
        S: SagaStep<Context = Ctx, Error = Err> + 'static,
    {
        let mut steps = self.steps;
        steps.push(Box::new(step));
        SagaBuilder {
            steps,
            retry_overrides: self.retry_overrides,
            _phantom: PhantomData,
        }
    }
}

impl<Ctx, Err> Default for SagaBuilder<Ctx, Err, Empty> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx, Err, State> SagaBuilder<Ctx, Err, State> {
    /// Override the retry policy of the step named `step_name`.
    ///
    /// Overrides take precedence over [`SagaStep::retry_policy`]. Names that
    /// match no step are ignored.
    #[must_use]
    pub fn with_retry_policy(mut self, step_name: impl Into<String>, policy: RetryPolicy) -> Self {
        self.retry_overrides.insert(step_name.into(), policy);
        self
    }
}

impl<Ctx, Err> SagaBuilder<Ctx, Err, HasSteps> {
    /// Add another step to the saga.
    #[must_use]
    pub fn then<S>(mut self, step: S) -> Self
    where
        S: SagaStep<Context = Ctx, Error = Err> + 'static,
    {
        self.steps.push(Box::new(step));
        self
    }

    /// Build the saga from the accumulated steps.
    #[must_use]
    pub fn build(self) -> Saga<Ctx, Err>
    where
        Err: Debug,
    {
        Saga::from_steps(self.steps, self.retry_overrides)
    }
}
