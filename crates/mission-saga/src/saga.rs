use std::collections::HashMap;
use std::fmt::Debug;

use tracing::{debug, warn};

use crate::audit::SagaAuditLog;
use crate::error::{CompensationError, SagaError};
use crate::result::{FailureKind, SagaStepResult};
use crate::retry::RetryPolicy;
use crate::step::SagaStep;

pub(crate) type BoxedStep<Ctx, Err> = Box<dyn SagaStep<Context = Ctx, Error = Err>>;

/// An optional step that failed without aborting the saga.
#[derive(Debug)]
pub struct OptionalStepFailure<E> {
    /// Name of the step.
    pub step: String,
    /// Message reported by the last attempt.
    pub message: String,
    /// The error reported by the last attempt.
    pub cause: Option<E>,
}

/// Summary of a saga run that reached its end.
#[derive(Debug)]
pub struct SagaReport<E> {
    executed: Vec<&'static str>,
    skipped: Vec<&'static str>,
    optional_failures: Vec<OptionalStepFailure<E>>,
}

impl<E> SagaReport<E> {
    /// Steps that completed successfully, in execution order.
    #[must_use]
    pub fn executed(&self) -> &[&'static str] {
        &self.executed
    }

    /// Steps whose predicate excluded them from the run.
    #[must_use]
    pub fn skipped(&self) -> &[&'static str] {
        &self.skipped
    }

    #[must_use]
    pub fn optional_failures(&self) -> &[OptionalStepFailure<E>] {
        &self.optional_failures
    }

    #[must_use]
    pub fn was_executed(&self, step_name: &str) -> bool {
        self.executed.iter().any(|name| *name == step_name)
    }
}

/// A compiled saga ready for execution.
///
/// Sagas run their steps in declared order against a shared, mutable
/// context. Steps whose predicate is false are skipped. A mandatory step
/// that still fails after its retries causes all previously executed steps
/// to be compensated in reverse order (LIFO); an optional step that fails is
/// logged and passed over.
pub struct Saga<Ctx, Err> {
    steps: Vec<BoxedStep<Ctx, Err>>,
    retry_overrides: HashMap<String, RetryPolicy>,
}

impl<Ctx, Err> Saga<Ctx, Err>
where
    Err: Debug,
{
    pub(crate) fn from_steps(
        steps: Vec<BoxedStep<Ctx, Err>>,
        retry_overrides: HashMap<String, RetryPolicy>,
    ) -> Self {
        Self {
            steps,
            retry_overrides,
        }
    }

    /// Names of all steps in declared order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    pub(crate) fn retry_policy_for(&self, index: usize) -> RetryPolicy {
        let step = &self.steps[index];
        self.retry_overrides
            .get(step.name())
            .copied()
            .unwrap_or_else(|| step.retry_policy())
    }

    /// Execute the saga against `ctx`.
    ///
    /// On failure, compensates all previously completed steps in reverse order.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::StepFailed` if a step fails and all compensations succeed.
    /// Returns `SagaError::CompensationFailed` if a step fails and some compensations also fail.
    pub fn execute(&self, ctx: &mut Ctx) -> Result<SagaReport<Err>, SagaError<Err>> {
        let (result, _audit_log) = self.execute_internal(ctx);
        result
    }

    /// Execute the saga and return both the result and an audit log.
    ///
    /// The audit log tracks all step executions, skips and compensations.
    pub fn execute_with_audit(
        &self,
        ctx: &mut Ctx,
    ) -> (Result<SagaReport<Err>, SagaError<Err>>, SagaAuditLog) {
        self.execute_internal(ctx)
    }

    fn execute_internal(
        &self,
        ctx: &mut Ctx,
    ) -> (Result<SagaReport<Err>, SagaError<Err>>, SagaAuditLog) {
        let mut audit_log = SagaAuditLog::new();
        // (step index, audit record index) of every executed step
        let mut compensation_stack: Vec<(usize, usize)> = Vec::new();
        let mut report = SagaReport {
            executed: Vec::new(),
            skipped: Vec::new(),
            optional_failures: Vec::new(),
        };

        for (index, step) in self.steps.iter().enumerate() {
            let name = step.name();

            if !step.should_execute(ctx) {
                debug!(step = name, "step not applicable, skipping");
                audit_log.skip(name);
                report.skipped.push(name);
                continue;
            }

            let record = audit_log.begin(name);
            let result = self.run_with_retry(index, ctx, &mut audit_log, record);

            if result.is_success() {
                debug!(step = name, message = result.message(), "step executed");
                audit_log.executed(record, result.message(), step.compensation_description());
                compensation_stack.push((index, record));
                report.executed.push(name);
                continue;
            }

            let aborts =
                step.is_mandatory() || result.failure_kind() == Some(FailureKind::Validation);
            audit_log.failed(record, result.message(), aborts);

            if aborts {
                let saga_error =
                    self.compensate(ctx, &mut audit_log, compensation_stack, name, result);
                return (Err(saga_error), audit_log);
            }

            warn!(
                step = name,
                message = result.message(),
                "optional step failed, continuing"
            );
            let (message, _payload, cause) = result.into_parts();
            report.optional_failures.push(OptionalStepFailure {
                step: name.to_string(),
                message,
                cause,
            });
        }

        (Ok(report), audit_log)
    }

    fn run_with_retry(
        &self,
        index: usize,
        ctx: &mut Ctx,
        audit_log: &mut SagaAuditLog,
        record: usize,
    ) -> SagaStepResult<Err> {
        let step = &self.steps[index];
        let policy = self.retry_policy_for(index);
        let mut failed_attempts = 0;

        loop {
            audit_log.attempt(record);
            let result = step.execute(ctx);

            if result.is_success() || !result.is_retryable() {
                return result;
            }

            failed_attempts += 1;
            if !policy.allows_retry(failed_attempts) {
                return result;
            }

            debug!(
                step = step.name(),
                attempt = failed_attempts,
                max_retries = policy.max_retries(),
                delay_ms = u64::try_from(policy.retry_delay().as_millis()).unwrap_or(u64::MAX),
                message = result.message(),
                "step failed, retrying"
            );
            policy.wait();
        }
    }

    fn compensate(
        &self,
        ctx: &mut Ctx,
        audit_log: &mut SagaAuditLog,
        mut compensation_stack: Vec<(usize, usize)>,
        failed_step: &str,
        step_result: SagaStepResult<Err>,
    ) -> SagaError<Err> {
        debug!(
            failed_step,
            count = compensation_stack.len(),
            "compensating executed steps"
        );
        let mut compensation_errors = Vec::new();

        while let Some((index, record)) = compensation_stack.pop() {
            let step = &self.steps[index];
            let step_name = step.name();
            let description = step.compensation_description();

            let result = step.compensate(ctx);
            audit_log.compensated(record, result.is_success(), result.message());
            if result.is_success() {
                debug!(step = step_name, message = result.message(), "step compensated");
            } else {
                warn!(
                    step = step_name,
                    message = result.message(),
                    "compensation failed, continuing with remaining steps"
                );
                let (message, _payload, error) = result.into_parts();
                compensation_errors.push(CompensationError {
                    step: step_name.to_string(),
                    description,
                    message,
                    error,
                });
            }
        }

        let (message, _payload, step_error) = step_result.into_parts();
        if compensation_errors.is_empty() {
            SagaError::StepFailed {
                step: failed_step.to_string(),
                message,
                source: step_error,
            }
        } else {
            SagaError::CompensationFailed {
                failed_step: failed_step.to_string(),
                message,
                step_error,
                compensation_errors,
            }
        }
    }
}
