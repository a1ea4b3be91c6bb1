use std::sync::Arc;

use mission_saga::{SagaStep, SagaStepResult};
use serde_json::json;
use tracing::debug;

use super::{StepResult, settle};
use crate::context::MissionSagaContext;
use crate::traits::{ExecutionRepository, InstanceRepository, MissionRepository};
use crate::types::{ExecutionStatus, Mission};
use crate::{OperationError, Result};

/// Loads the mission and the record being completed, and checks that the
/// requesting user owns it and that it is still in progress.
///
/// Read-only: nothing to compensate.
pub struct LoadMissionDataStep<M, E, I> {
    missions: Arc<M>,
    executions: Arc<E>,
    instances: Arc<I>,
}

impl<M, E, I> LoadMissionDataStep<M, E, I>
where
    M: MissionRepository,
    E: ExecutionRepository,
    I: InstanceRepository,
{
    #[must_use]
    pub fn new(missions: Arc<M>, executions: Arc<E>, instances: Arc<I>) -> Self {
        Self {
            missions,
            executions,
            instances,
        }
    }

    fn find_mission(&self, mission_id: i64) -> Result<Mission> {
        self.missions
            .find_mission(mission_id)?
            .ok_or_else(|| OperationError::NotFound {
                entity: "mission",
                id: mission_id.to_string(),
            })
    }

    fn load_execution(&self, ctx: &mut MissionSagaContext) -> Result<StepResult> {
        let mission = self.find_mission(ctx.target_id)?;

        let participant = self
            .missions
            .find_participant(mission.id, &ctx.user_id)?
            .ok_or_else(|| OperationError::NotParticipant {
                mission_id: mission.id,
                user_id: ctx.user_id.clone(),
            })?;
        if !participant.status.is_active() {
            return Err(OperationError::ParticipantInactive {
                mission_id: mission.id,
                participant_id: participant.id,
                status: participant.status,
            });
        }

        let execution = self
            .executions
            .find_in_progress(participant.id)?
            .ok_or(OperationError::NoExecutionInProgress {
                mission_id: mission.id,
            })?;
        if execution.user_id != ctx.user_id {
            return Err(OperationError::NotOwner {
                entity: "execution",
                id: execution.id,
                user_id: ctx.user_id.clone(),
            });
        }
        if execution.status != ExecutionStatus::InProgress {
            return Err(OperationError::InvalidStatus {
                entity: "execution",
                id: execution.id,
                expected: ExecutionStatus::InProgress,
                actual: execution.status,
            });
        }

        debug!(
            mission_id = mission.id,
            participant_id = participant.id,
            execution_id = execution.id,
            progress = participant.progress,
            "loaded mission execution"
        );

        let payload = json!({
            "mission_id": mission.id,
            "execution_id": execution.id,
            "guild_mission": mission.is_guild_mission(),
        });
        ctx.apply_mission(mission);
        ctx.participant = Some(participant);
        ctx.execution = Some(execution);
        Ok(SagaStepResult::success_with("mission data loaded", payload))
    }

    fn load_instance(&self, ctx: &mut MissionSagaContext) -> Result<StepResult> {
        let instance = self
            .instances
            .find_by_id(ctx.target_id)?
            .ok_or_else(|| OperationError::NotFound {
                entity: "mission instance",
                id: ctx.target_id.to_string(),
            })?;
        if instance.user_id != ctx.user_id {
            return Err(OperationError::NotOwner {
                entity: "mission instance",
                id: instance.id,
                user_id: ctx.user_id.clone(),
            });
        }
        if instance.status != ExecutionStatus::InProgress {
            return Err(OperationError::InvalidStatus {
                entity: "mission instance",
                id: instance.id,
                expected: ExecutionStatus::InProgress,
                actual: instance.status,
            });
        }

        let mission = self.find_mission(instance.mission_id)?;
        debug!(
            mission_id = mission.id,
            instance_id = instance.id,
            "loaded pinned mission instance"
        );

        let payload = json!({
            "mission_id": mission.id,
            "instance_id": instance.id,
            "guild_mission": mission.is_guild_mission(),
        });
        ctx.apply_mission(mission);
        ctx.instance = Some(instance);
        Ok(SagaStepResult::success_with("mission data loaded", payload))
    }
}

impl<M, E, I> SagaStep for LoadMissionDataStep<M, E, I>
where
    M: MissionRepository + 'static,
    E: ExecutionRepository + 'static,
    I: InstanceRepository + 'static,
{
    type Context = MissionSagaContext;
    type Error = OperationError;

    fn name(&self) -> &'static str {
        "load_mission_data"
    }

    fn execute(&self, ctx: &mut Self::Context) -> StepResult {
        let loaded = if ctx.pinned {
            self.load_instance(ctx)
        } else {
            self.load_execution(ctx)
        };
        settle(loaded, "failed to load mission data")
    }

    fn compensation_description(&self) -> String {
        "nothing to undo for read-only mission load".to_string()
    }
}
