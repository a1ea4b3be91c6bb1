use std::path::PathBuf;

use mission_saga::SagaError;
use thiserror::Error;

use crate::types::{ExecutionStatus, ParticipantStatus};

/// Details about a failed compensation during saga rollback.
#[derive(Debug)]
pub struct CompensationFailure {
    /// Name of the step whose compensation failed.
    pub step: String,
    /// Description of what the compensation was trying to do.
    pub description: String,
    /// Message reported by the compensation.
    pub message: String,
    /// The error that occurred during compensation, if one was reported.
    pub error: Option<Box<OperationError>>,
}

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("{service} call failed: {message}")]
    Collaborator {
        service: &'static str,
        message: String,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("user '{user_id}' does not own {entity} {id}")]
    NotOwner {
        entity: &'static str,
        id: i64,
        user_id: String,
    },

    #[error("user '{user_id}' is not participating in mission {mission_id}")]
    NotParticipant { mission_id: i64, user_id: String },

    #[error("participant {participant_id} has left mission {mission_id} ({status:?})")]
    ParticipantInactive {
        mission_id: i64,
        participant_id: i64,
        status: ParticipantStatus,
    },

    #[error("no execution in progress for mission {mission_id}")]
    NoExecutionInProgress { mission_id: i64 },

    #[error("{entity} {id} is {actual:?}, expected {expected:?}")]
    InvalidStatus {
        entity: &'static str,
        id: i64,
        expected: ExecutionStatus,
        actual: ExecutionStatus,
    },

    #[error("{entity} {id} was already completed by another request")]
    AlreadyCompleted { entity: &'static str, id: i64 },

    #[error("{resource} changed concurrently (expected {expected}, found {found})")]
    ConcurrentModification {
        resource: String,
        expected: String,
        found: String,
    },

    #[error(
        "execution {execution_id} stays claimed after a failed progress update ({cause}): {source}"
    )]
    ExecutionNotReleased {
        execution_id: i64,
        cause: Box<OperationError>,
        #[source]
        source: Box<OperationError>,
    },

    #[error(
        "restore left incomplete: {}",
        failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    )]
    PartialRestore { failures: Vec<OperationError> },

    #[error("mission data is not loaded: missing {0}")]
    MissingContext(&'static str),

    #[error("failed to read completion config '{path}'")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse completion config '{origin}'")]
    ConfigParse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("completion config names unknown step '{step}' (known: {known})")]
    UnknownStep { step: String, known: String },

    #[error("mission completion failed at step '{step}': {message}")]
    SagaFailed {
        step: String,
        message: String,
        #[source]
        source: Option<Box<OperationError>>,
    },

    #[error(
        "mission completion failed at step '{step}': {message}, and {} compensation(s) also failed",
        compensation_failures.len()
    )]
    SagaCompensationFailed {
        step: String,
        message: String,
        #[source]
        source: Option<Box<OperationError>>,
        compensation_failures: Vec<CompensationFailure>,
    },
}

impl OperationError {
    pub fn collaborator(service: &'static str, message: impl Into<String>) -> Self {
        Self::Collaborator {
            service,
            message: message.into(),
        }
    }

    /// Whether the error rejects the request itself rather than reporting a
    /// failing dependency. Such errors are never worth retrying.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::NotOwner { .. }
                | Self::NotParticipant { .. }
                | Self::ParticipantInactive { .. }
                | Self::NoExecutionInProgress { .. }
                | Self::InvalidStatus { .. }
                | Self::AlreadyCompleted { .. }
                | Self::MissingContext(_)
        )
    }

    /// Name of the saga step that aborted the completion, if any.
    #[must_use]
    pub fn failed_step(&self) -> Option<&str> {
        match self {
            Self::SagaFailed { step, .. } | Self::SagaCompensationFailed { step, .. } => {
                Some(step)
            }
            _ => None,
        }
    }

    /// The innermost error that caused a saga step to fail.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::SagaFailed {
                source: Some(inner),
                ..
            }
            | Self::SagaCompensationFailed {
                source: Some(inner),
                ..
            } => inner.root_cause(),
            _ => self,
        }
    }
}

pub type Result<T> = std::result::Result<T, OperationError>;

impl From<SagaError<OperationError>> for OperationError {
    fn from(err: SagaError<OperationError>) -> Self {
        match err {
            SagaError::StepFailed {
                step,
                message,
                source,
            } => Self::SagaFailed {
                step,
                message,
                source: source.map(Box::new),
            },
            SagaError::CompensationFailed {
                failed_step,
                message,
                step_error,
                compensation_errors,
            } => {
                let compensation_failures = compensation_errors
                    .into_iter()
                    .map(|e| CompensationFailure {
                        step: e.step,
                        description: e.description,
                        message: e.message,
                        error: e.error.map(Box::new),
                    })
                    .collect();
                Self::SagaCompensationFailed {
                    step: failed_step,
                    message,
                    source: step_error.map(Box::new),
                    compensation_failures,
                }
            }
            other => Self::SagaFailed {
                step: other.failed_step().to_string(),
                message: other.to_string(),
                source: None,
            },
        }
    }
}
