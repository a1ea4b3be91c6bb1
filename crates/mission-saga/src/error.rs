use std::fmt::Debug;

use thiserror::Error;

/// Error from a failed compensation operation.
#[derive(Debug, thiserror::Error)]
#[error("compensation failed for step '{step}': {message}")]
pub struct CompensationError<E> {
    /// Name of the step whose compensation failed.
    pub step: String,
    /// Description of what the compensation was trying to do.
    pub description: String,
    /// Message reported by the failed compensation.
    pub message: String,
    /// The underlying error, if the step reported one.
    #[source]
    pub error: Option<E>,
}

/// Error from saga execution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SagaError<E: Debug> {
    /// A step failed and all compensations succeeded.
    #[error("step '{step}' failed: {message}")]
    StepFailed {
        /// Name of the step that failed.
        step: String,
        /// Message reported by the failed step.
        message: String,
        /// The error that caused the step to fail.
        #[source]
        source: Option<E>,
    },

    /// A step failed and some compensations also failed.
    #[error("step '{failed_step}' failed: {message}, and {} compensation(s) also failed", compensation_errors.len())]
    CompensationFailed {
        /// Name of the step that originally failed.
        failed_step: String,
        /// Message reported by the failed step.
        message: String,
        /// The error from the failed step.
        step_error: Option<E>,
        /// Errors from failed compensations, in the order they were attempted.
        compensation_errors: Vec<CompensationError<E>>,
    },
}

impl<E: Debug> SagaError<E> {
    /// Name of the step that aborted the saga.
    ///
    /// Compensation failures are secondary; this always names the original
    /// failure.
    #[must_use]
    pub fn failed_step(&self) -> &str {
        match self {
            Self::StepFailed { step, .. } => step,
            Self::CompensationFailed { failed_step, .. } => failed_step,
        }
    }

    /// The underlying error of the step that aborted the saga.
    #[must_use]
    pub fn step_error(&self) -> Option<&E> {
        match self {
            Self::StepFailed { source, .. } => source.as_ref(),
            Self::CompensationFailed { step_error, .. } => step_error.as_ref(),
        }
    }

    #[must_use]
    pub fn compensation_errors(&self) -> &[CompensationError<E>] {
        match self {
            Self::StepFailed { .. } => &[],
            Self::CompensationFailed {
                compensation_errors,
                ..
            } => compensation_errors,
        }
    }
}
