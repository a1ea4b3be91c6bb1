mod config;
mod context;
mod error;
pub mod operation;
pub mod steps;
pub mod traits;
mod types;

#[cfg(test)]
pub mod mocks;

pub use config::{CompletionConfig, StepSettings};
pub use context::{MissionSagaContext, keys};
pub use error::{CompensationFailure, OperationError, Result};
pub use operation::{
    CompleteMissionInput, CompleteMissionOperation, MissionCompletionOutput, MissionServices,
};
pub use types::{
    CompletionTarget, ExecutionStatus, ExpSourceType, ExperienceGrant, ExperienceState, Feed,
    FeedDraft, GuildExpInfo, GuildExpSource, Mission, MissionExecution, MissionInstance,
    MissionParticipant, ParticipantStatus,
};
