use crate::result::SagaStepResult;
use crate::retry::RetryPolicy;

/// A step in a saga that can be executed and compensated.
///
/// Steps are stateless and reentrant: everything a run produces lives in the
/// shared `Context`, which the executor threads through every call by
/// mutable reference. A step that mutates external state must snapshot the
/// previous value into the context before mutating, so that `compensate`
/// can undo it.
///
/// # Type Parameters
///
/// - `Context`: Per-run state shared by all steps of a saga
/// - `Error`: The error type carried as the cause of a failed result
pub trait SagaStep: Send + Sync {
    /// Per-run state shared by all steps.
    type Context;

    /// Error type carried by failed results.
    type Error;

    /// Human-readable name for logging and error messages.
    fn name(&self) -> &'static str;

    /// Whether a failure of this step aborts the saga.
    ///
    /// Optional steps that fail are logged and skipped over; nothing is
    /// compensated on their behalf.
    fn is_mandatory(&self) -> bool {
        true
    }

    /// Whether this step applies to the current run.
    ///
    /// A step returning `false` is not executed, not retried and never
    /// compensated.
    fn should_execute(&self, ctx: &Self::Context) -> bool {
        let _ = ctx;
        true
    }

    /// Retry behaviour for transient failures of `execute`.
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::none()
    }

    /// Execute the step.
    ///
    /// Errors from collaborators are converted into a failed result rather
    /// than propagated.
    fn execute(&self, ctx: &mut Self::Context) -> SagaStepResult<Self::Error>;

    /// Compensate (undo) the step's effects.
    ///
    /// Only called for steps whose `execute` succeeded, in reverse order,
    /// when a later mandatory step fails. Must succeed trivially when there
    /// is nothing to undo.
    ///
    /// The default implementation is a no-op, suitable for read-only steps.
    fn compensate(&self, ctx: &mut Self::Context) -> SagaStepResult<Self::Error> {
        let _ = ctx;
        SagaStepResult::success(format!("{} has nothing to compensate", self.name()))
    }

    /// Human-readable description of what compensation will do.
    fn compensation_description(&self) -> String {
        format!("undo {}", self.name())
    }
}
