use serde_json::Value;

/// Whether a step attempt succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    Failure,
}

/// Classification of a failed step attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FailureKind {
    /// A downstream call failed; the attempt may be retried.
    Transient,
    /// The operation must not proceed at all. Never retried, and aborts the
    /// saga even when the step is optional.
    Validation,
}

/// Outcome of a single `execute` or `compensate` call.
///
/// Results are built once through the constructors and never mutated.
#[derive(Debug)]
pub struct SagaStepResult<E> {
    outcome: StepOutcome,
    failure_kind: Option<FailureKind>,
    message: String,
    payload: Option<Value>,
    cause: Option<E>,
}

impl<E> SagaStepResult<E> {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            outcome: StepOutcome::Success,
            failure_kind: None,
            message: message.into(),
            payload: None,
            cause: None,
        }
    }

    /// Successful outcome carrying a payload such as the amount granted.
    #[must_use]
    pub fn success_with(message: impl Into<String>, payload: Value) -> Self {
        Self {
            payload: Some(payload),
            ..Self::success(message)
        }
    }

    /// Transient failure caused by a downstream error.
    #[must_use]
    pub fn failure(message: impl Into<String>, cause: E) -> Self {
        Self {
            outcome: StepOutcome::Failure,
            failure_kind: Some(FailureKind::Transient),
            message: message.into(),
            payload: None,
            cause: Some(cause),
        }
    }

    /// Transient failure without an underlying error value.
    #[must_use]
    pub fn failure_message(message: impl Into<String>) -> Self {
        Self {
            outcome: StepOutcome::Failure,
            failure_kind: Some(FailureKind::Transient),
            message: message.into(),
            payload: None,
            cause: None,
        }
    }

    /// Non-retryable failure: wrong owner, wrong status, invalid input.
    #[must_use]
    pub fn validation_failure(message: impl Into<String>, cause: E) -> Self {
        Self {
            outcome: StepOutcome::Failure,
            failure_kind: Some(FailureKind::Validation),
            message: message.into(),
            payload: None,
            cause: Some(cause),
        }
    }

    #[must_use]
    pub fn outcome(&self) -> StepOutcome {
        self.outcome
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == StepOutcome::Success
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.outcome == StepOutcome::Failure
    }

    /// `None` for successful results.
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure_kind
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.failure_kind == Some(FailureKind::Transient)
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    #[must_use]
    pub fn cause(&self) -> Option<&E> {
        self.cause.as_ref()
    }

    /// Split the result into its message, payload and cause.
    #[must_use]
    pub fn into_parts(self) -> (String, Option<Value>, Option<E>) {
        (self.message, self.payload, self.cause)
    }
}
