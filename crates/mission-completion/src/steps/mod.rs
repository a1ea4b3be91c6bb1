//! The steps of a mission completion, in the order the use case runs them.

mod complete_mission_instance;
mod create_feed_from_mission;
mod grant_guild_experience;
mod grant_user_experience;
mod load_mission_data;
mod update_participant_progress;

pub use complete_mission_instance::CompleteMissionInstanceStep;
pub use create_feed_from_mission::CreateFeedFromMissionStep;
pub use grant_guild_experience::GrantGuildExperienceStep;
pub use grant_user_experience::GrantUserExperienceStep;
pub use load_mission_data::LoadMissionDataStep;
pub use update_participant_progress::UpdateParticipantProgressStep;

use mission_saga::SagaStepResult;

use crate::OperationError;

pub(crate) type StepResult = SagaStepResult<OperationError>;

/// Turns the load step's body into a step result.
///
/// Errors that reject the request become validation failures; everything
/// else is reported as transient so the step's retry policy applies.
pub(crate) fn settle(result: crate::Result<StepResult>, context: &str) -> StepResult {
    settle_with(result, context, OperationError::is_validation)
}

/// Settles a step that claims the completion: only losing the claim, or
/// leaving it stuck, rejects the request.
pub(crate) fn settle_claim(result: crate::Result<StepResult>, context: &str) -> StepResult {
    settle_with(result, context, |err| {
        matches!(
            err,
            OperationError::AlreadyCompleted { .. } | OperationError::ExecutionNotReleased { .. }
        )
    })
}

/// Settles a step whose failures are always worth retrying, whatever the
/// collaborator reported.
pub(crate) fn settle_transient(result: crate::Result<StepResult>, context: &str) -> StepResult {
    settle_with(result, context, |_| false)
}

fn settle_with(
    result: crate::Result<StepResult>,
    context: &str,
    rejects: impl Fn(&OperationError) -> bool,
) -> StepResult {
    match result {
        Ok(outcome) => outcome,
        Err(err) if rejects(&err) => {
            SagaStepResult::validation_failure(format!("{context}: {err}"), err)
        }
        Err(err) => SagaStepResult::failure(format!("{context}: {err}"), err),
    }
}
