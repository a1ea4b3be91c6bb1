use std::sync::Arc;

use mission_saga::{SagaStep, SagaStepResult};
use serde_json::json;
use tracing::{debug, warn};

use super::{StepResult, settle_claim};
use crate::context::{MissionSagaContext, keys};
use crate::traits::{ExecutionRepository, MissionRepository};
use crate::types::{ExecutionStatus, MissionExecution, MissionParticipant, ParticipantStatus};
use crate::{OperationError, Result};

/// Completes the in-progress execution of a regular mission and recomputes
/// the participant's progress from the number of completed executions.
pub struct UpdateParticipantProgressStep<M, E> {
    missions: Arc<M>,
    executions: Arc<E>,
}

/// Completion percentage, capped at 100.
fn progress_percent(completed: u32, total: u32) -> u8 {
    let total = u64::from(total.max(1));
    let percent = (u64::from(completed) * 100 / total).min(100);
    u8::try_from(percent).unwrap_or(100)
}

impl<M, E> UpdateParticipantProgressStep<M, E>
where
    M: MissionRepository,
    E: ExecutionRepository,
{
    #[must_use]
    pub fn new(missions: Arc<M>, executions: Arc<E>) -> Self {
        Self {
            missions,
            executions,
        }
    }

    fn update(&self, ctx: &mut MissionSagaContext) -> Result<StepResult> {
        let execution = ctx
            .execution
            .clone()
            .ok_or(OperationError::MissingContext("execution"))?;
        let participant = ctx
            .participant
            .clone()
            .ok_or(OperationError::MissingContext("participant"))?;
        let total = ctx
            .mission
            .as_ref()
            .map(|mission| mission.total_executions)
            .ok_or(OperationError::MissingContext("mission"))?;

        ctx.add_compensation_data(keys::INSTANCE_STATUS_BEFORE, execution.status);
        ctx.add_compensation_data(keys::PARTICIPANT_PROGRESS_BEFORE, participant.progress);
        ctx.add_compensation_data(keys::PARTICIPANT_STATUS_BEFORE, participant.status);

        if !self.executions.complete_if_in_progress(execution.id)? {
            return Err(OperationError::AlreadyCompleted {
                entity: "execution",
                id: execution.id,
            });
        }

        let updated = self
            .record_progress(&participant, total)
            .map_err(|err| self.release_execution(&execution, err))?;

        ctx.add_compensation_data(keys::INSTANCE_STATUS_AFTER, ExecutionStatus::Completed);
        ctx.add_compensation_data(keys::PARTICIPANT_PROGRESS_AFTER, updated.progress);
        ctx.add_compensation_data(keys::PARTICIPANT_STATUS_AFTER, updated.status);

        debug!(
            execution_id = execution.id,
            participant_id = participant.id,
            progress_before = participant.progress,
            progress_after = updated.progress,
            "completed execution and updated progress"
        );

        let payload = json!({
            "execution_id": execution.id,
            "progress": updated.progress,
            "participant_completed": updated.status == ParticipantStatus::Completed,
        });
        ctx.progress = Some(updated.progress);
        if let Some(execution) = ctx.execution.as_mut() {
            execution.status = ExecutionStatus::Completed;
        }
        ctx.participant = Some(updated);
        Ok(SagaStepResult::success_with("participant progress updated", payload))
    }

    fn record_progress(
        &self,
        participant: &MissionParticipant,
        total: u32,
    ) -> Result<MissionParticipant> {
        let completed = self
            .executions
            .count_by_status(participant.id, ExecutionStatus::Completed)?;

        let mut updated = participant.clone();
        updated.progress = progress_percent(completed, total);
        if updated.progress >= 100 {
            updated.status = ParticipantStatus::Completed;
        }
        self.missions.save_participant(&updated)?;
        Ok(updated)
    }

    /// Puts an execution claimed by a failed attempt back in progress so the
    /// next attempt can claim it again. Returns the error to report for the
    /// attempt.
    fn release_execution(
        &self,
        execution: &MissionExecution,
        cause: OperationError,
    ) -> OperationError {
        let mut released = execution.clone();
        released.status = ExecutionStatus::InProgress;
        match self.executions.save(&released) {
            Ok(()) => cause,
            Err(err) => {
                warn!(
                    execution_id = execution.id,
                    error = %err,
                    "failed to release execution after progress update failure"
                );
                OperationError::ExecutionNotReleased {
                    execution_id: execution.id,
                    cause: Box::new(cause),
                    source: Box::new(err),
                }
            }
        }
    }

    fn revert(&self, ctx: &mut MissionSagaContext) -> Result<StepResult> {
        let (Some(status_before), Some(status_after)) = (
            ctx.compensation_data(keys::INSTANCE_STATUS_BEFORE),
            ctx.compensation_data(keys::INSTANCE_STATUS_AFTER),
        ) else {
            return Ok(SagaStepResult::success("no execution was completed"));
        };
        let execution_id = ctx
            .execution
            .as_ref()
            .map(|execution| execution.id)
            .ok_or(OperationError::MissingContext("execution"))?;
        let mission_id = ctx
            .mission_id()
            .ok_or(OperationError::MissingContext("mission"))?;

        // Restore both records even when one of them conflicts.
        let execution_restored = self.restore_execution(execution_id, status_before, status_after);
        if let (Ok(_), Some(execution)) = (&execution_restored, ctx.execution.as_mut()) {
            execution.status = status_before;
        }
        let participant_restored = self.restore_participant(ctx, mission_id);
        if let Ok(Some(participant)) = &participant_restored {
            ctx.progress = Some(participant.progress);
            ctx.participant = Some(participant.clone());
        }

        match (execution_restored, participant_restored) {
            (Ok(restored), Ok(_)) => Ok(SagaStepResult::success(if restored {
                "execution and participant progress restored"
            } else {
                "execution and participant progress already restored"
            })),
            (execution, participant) => Err(OperationError::PartialRestore {
                failures: [execution.err(), participant.err()]
                    .into_iter()
                    .flatten()
                    .collect(),
            }),
        }
    }

    fn restore_participant(
        &self,
        ctx: &MissionSagaContext,
        mission_id: i64,
    ) -> Result<Option<MissionParticipant>> {
        let (Some(progress_before), Some(status_before), Some(progress_after), Some(status_after)) = (
            ctx.compensation_data(keys::PARTICIPANT_PROGRESS_BEFORE),
            ctx.compensation_data(keys::PARTICIPANT_STATUS_BEFORE),
            ctx.compensation_data(keys::PARTICIPANT_PROGRESS_AFTER),
            ctx.compensation_data(keys::PARTICIPANT_STATUS_AFTER),
        ) else {
            return Ok(None);
        };

        let mut current = self
            .missions
            .find_participant(mission_id, &ctx.user_id)?
            .ok_or_else(|| OperationError::NotParticipant {
                mission_id,
                user_id: ctx.user_id.clone(),
            })?;

        if current.progress == progress_before && current.status == status_before {
            return Ok(Some(current));
        }
        if current.progress != progress_after || current.status != status_after {
            return Err(OperationError::ConcurrentModification {
                resource: format!("progress of participant {}", current.id),
                expected: format!("{progress_after}% ({status_after:?})"),
                found: format!("{}% ({:?})", current.progress, current.status),
            });
        }

        current.progress = progress_before;
        current.status = status_before;
        self.missions.save_participant(&current)?;
        debug!(
            participant_id = current.id,
            progress = progress_before,
            "restored participant progress"
        );
        Ok(Some(current))
    }

    /// Returns `false` when the execution already had its original status.
    fn restore_execution(
        &self,
        execution_id: i64,
        status_before: ExecutionStatus,
        status_after: ExecutionStatus,
    ) -> Result<bool> {
        let mut current = self
            .executions
            .find_by_id(execution_id)?
            .ok_or_else(|| OperationError::NotFound {
                entity: "execution",
                id: execution_id.to_string(),
            })?;

        if current.status == status_before {
            return Ok(false);
        }
        if current.status != status_after {
            return Err(OperationError::ConcurrentModification {
                resource: format!("status of execution {execution_id}"),
                expected: format!("{status_after:?}"),
                found: format!("{:?}", current.status),
            });
        }

        current.status = status_before;
        self.executions.save(&current)?;
        debug!(execution_id, status = ?status_before, "restored execution status");
        Ok(true)
    }
}

impl<M, E> SagaStep for UpdateParticipantProgressStep<M, E>
where
    M: MissionRepository + 'static,
    E: ExecutionRepository + 'static,
{
    type Context = MissionSagaContext;
    type Error = OperationError;

    fn name(&self) -> &'static str {
        "update_participant_progress"
    }

    fn should_execute(&self, ctx: &Self::Context) -> bool {
        !ctx.pinned
    }

    fn execute(&self, ctx: &mut Self::Context) -> StepResult {
        settle_claim(self.update(ctx), "failed to update participant progress")
    }

    fn compensate(&self, ctx: &mut Self::Context) -> StepResult {
        settle_claim(self.revert(ctx), "failed to restore participant progress")
    }

    fn compensation_description(&self) -> String {
        "restore execution status and participant progress".to_string()
    }
}
