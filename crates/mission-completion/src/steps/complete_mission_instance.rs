use std::sync::Arc;

use mission_saga::{SagaStep, SagaStepResult};
use serde_json::json;
use tracing::debug;

use super::{StepResult, settle_claim};
use crate::context::{MissionSagaContext, keys};
use crate::traits::InstanceRepository;
use crate::types::ExecutionStatus;
use crate::{OperationError, Result};

/// Moves a pinned mission instance to `Completed`.
pub struct CompleteMissionInstanceStep<I> {
    instances: Arc<I>,
}

impl<I: InstanceRepository> CompleteMissionInstanceStep<I> {
    #[must_use]
    pub fn new(instances: Arc<I>) -> Self {
        Self { instances }
    }

    fn complete(&self, ctx: &mut MissionSagaContext) -> Result<StepResult> {
        let (instance_id, status_before) = ctx
            .instance
            .as_ref()
            .map(|instance| (instance.id, instance.status))
            .ok_or(OperationError::MissingContext("mission instance"))?;
        ctx.add_compensation_data(keys::INSTANCE_STATUS_BEFORE, status_before);

        if !self.instances.complete_if_in_progress(instance_id)? {
            return Err(OperationError::AlreadyCompleted {
                entity: "mission instance",
                id: instance_id,
            });
        }

        ctx.add_compensation_data(keys::INSTANCE_STATUS_AFTER, ExecutionStatus::Completed);
        if let Some(instance) = ctx.instance.as_mut() {
            instance.status = ExecutionStatus::Completed;
        }

        debug!(instance_id, "completed pinned mission instance");
        Ok(SagaStepResult::success_with(
            "mission instance completed",
            json!({ "instance_id": instance_id }),
        ))
    }

    fn revert(&self, ctx: &mut MissionSagaContext) -> Result<StepResult> {
        let (Some(status_before), Some(status_after)) = (
            ctx.compensation_data(keys::INSTANCE_STATUS_BEFORE),
            ctx.compensation_data(keys::INSTANCE_STATUS_AFTER),
        ) else {
            return Ok(SagaStepResult::success("no instance was completed"));
        };
        let instance_id = ctx
            .instance
            .as_ref()
            .map(|instance| instance.id)
            .ok_or(OperationError::MissingContext("mission instance"))?;

        let mut current = self
            .instances
            .find_by_id(instance_id)?
            .ok_or_else(|| OperationError::NotFound {
                entity: "mission instance",
                id: instance_id.to_string(),
            })?;

        if current.status == status_before {
            return Ok(SagaStepResult::success("mission instance already restored"));
        }
        if current.status != status_after {
            return Err(OperationError::ConcurrentModification {
                resource: format!("status of mission instance {instance_id}"),
                expected: format!("{status_after:?}"),
                found: format!("{:?}", current.status),
            });
        }

        current.status = status_before;
        self.instances.save(&current)?;
        if let Some(instance) = ctx.instance.as_mut() {
            instance.status = status_before;
        }
        debug!(instance_id, status = ?status_before, "restored mission instance status");
        Ok(SagaStepResult::success("mission instance status restored"))
    }
}

impl<I> SagaStep for CompleteMissionInstanceStep<I>
where
    I: InstanceRepository + 'static,
{
    type Context = MissionSagaContext;
    type Error = OperationError;

    fn name(&self) -> &'static str {
        "complete_mission_instance"
    }

    fn should_execute(&self, ctx: &Self::Context) -> bool {
        ctx.pinned
    }

    fn execute(&self, ctx: &mut Self::Context) -> StepResult {
        settle_claim(self.complete(ctx), "failed to complete mission instance")
    }

    fn compensate(&self, ctx: &mut Self::Context) -> StepResult {
        settle_claim(self.revert(ctx), "failed to restore mission instance")
    }

    fn compensation_description(&self) -> String {
        "restore the mission instance status".to_string()
    }
}
