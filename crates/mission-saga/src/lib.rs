//! Saga pattern for multi-step operations that span independent systems.
//!
//! A saga runs an ordered list of steps against a shared, mutable context.
//! Each step commits on its own; when a mandatory step fails after its
//! retries, every step that already succeeded is compensated in reverse
//! order. Steps can opt out of a run through a predicate, and optional steps
//! may fail without undoing anything.

mod audit;
mod builder;
mod cloneable;
mod compensation;
mod error;
mod result;
mod retry;
mod saga;
mod step;

pub use audit::{SagaAuditLog, StepRecord, StepStatus};
pub use builder::{Empty, HasSteps, SagaBuilder};
pub use compensation::{CompensationData, CompensationKey};
pub use error::{CompensationError, SagaError};
pub use result::{FailureKind, SagaStepResult, StepOutcome};
pub use retry::RetryPolicy;
pub use saga::{OptionalStepFailure, Saga, SagaReport};
pub use step::SagaStep;
