use std::sync::Arc;

use mission_saga::{SagaStep, SagaStepResult};
use serde_json::json;
use tracing::debug;

use super::{StepResult, settle_transient};
use crate::context::{MissionSagaContext, keys};
use crate::traits::ExperienceService;
use crate::types::{ExpSourceType, ExperienceGrant};
use crate::{OperationError, Result};

/// Grants the mission's experience reward to the completing user.
///
/// Compensation subtracts the granted amount, but only while the user's
/// total experience still matches what the grant produced.
pub struct GrantUserExperienceStep<X> {
    experience: Arc<X>,
}

impl<X: ExperienceService> GrantUserExperienceStep<X> {
    #[must_use]
    pub fn new(experience: Arc<X>) -> Self {
        Self { experience }
    }

    fn grant_for(ctx: &MissionSagaContext, amount: i64) -> ExperienceGrant {
        let (source_type, source_id) = if ctx.pinned {
            (ExpSourceType::MissionInstance, ctx.target_id)
        } else {
            (
                ExpSourceType::MissionExecution,
                ctx.execution.as_ref().map_or(ctx.target_id, |e| e.id),
            )
        };
        ExperienceGrant {
            user_id: ctx.user_id.clone(),
            amount,
            source_type,
            source_id,
            description: format!("Completed mission: {}", ctx.title),
            category_id: ctx.category_id,
            category_name: ctx.category_name.clone(),
        }
    }

    fn grant(&self, ctx: &mut MissionSagaContext) -> Result<StepResult> {
        let amount = ctx.user_exp_earned;
        if amount <= 0 {
            return Ok(SagaStepResult::success("mission grants no experience"));
        }

        let before = self.experience.current(&ctx.user_id)?;
        ctx.add_compensation_data(keys::USER_EXP_BEFORE, before.total_exp);
        ctx.add_compensation_data(keys::USER_LEVEL_BEFORE, before.level);
        ctx.user_level_before = Some(before.level);

        let after = self.experience.grant(&Self::grant_for(ctx, amount))?;
        ctx.add_compensation_data(keys::USER_EXP_AFTER, after.total_exp);
        ctx.add_compensation_data(keys::USER_EXP_GRANTED, amount);
        ctx.user_level_after = Some(after.level);

        debug!(
            user_id = %ctx.user_id,
            amount,
            level_before = before.level,
            level_after = after.level,
            "granted user experience"
        );

        Ok(SagaStepResult::success_with(
            format!("granted {amount} experience"),
            json!({
                "exp_granted": amount,
                "level_before": before.level,
                "level_after": after.level,
            }),
        ))
    }

    fn revert(&self, ctx: &mut MissionSagaContext) -> Result<StepResult> {
        let (Some(before), Some(after), Some(amount)) = (
            ctx.compensation_data(keys::USER_EXP_BEFORE),
            ctx.compensation_data(keys::USER_EXP_AFTER),
            ctx.compensation_data(keys::USER_EXP_GRANTED),
        ) else {
            return Ok(SagaStepResult::success("no experience was granted"));
        };

        let current = self.experience.current(&ctx.user_id)?;
        if current.total_exp == before {
            return Ok(SagaStepResult::success("user experience already reverted"));
        }
        if current.total_exp != after {
            return Err(OperationError::ConcurrentModification {
                resource: format!("experience of user '{}'", ctx.user_id),
                expected: after.to_string(),
                found: current.total_exp.to_string(),
            });
        }

        let restored = self.experience.subtract(&Self::grant_for(ctx, amount))?;
        ctx.user_level_after = Some(restored.level);
        debug!(
            user_id = %ctx.user_id,
            amount,
            level = restored.level,
            "reverted user experience"
        );
        Ok(SagaStepResult::success(format!(
            "subtracted {amount} experience"
        )))
    }
}

impl<X> SagaStep for GrantUserExperienceStep<X>
where
    X: ExperienceService + 'static,
{
    type Context = MissionSagaContext;
    type Error = OperationError;

    fn name(&self) -> &'static str {
        "grant_user_experience"
    }

    fn execute(&self, ctx: &mut Self::Context) -> StepResult {
        settle_transient(self.grant(ctx), "failed to grant user experience")
    }

    fn compensate(&self, ctx: &mut Self::Context) -> StepResult {
        settle_transient(self.revert(ctx), "failed to revert user experience")
    }

    fn compensation_description(&self) -> String {
        "subtract the experience granted to the user".to_string()
    }
}

#[cfg(test)]
mod tests {
    use mission_saga::SagaStep;

    use super::*;
    use crate::mocks::{Fixture, MockExperienceService, USER_ID};

    fn granted_context(
        fixture: &Fixture,
    ) -> (GrantUserExperienceStep<MockExperienceService>, MissionSagaContext) {
        let step = GrantUserExperienceStep::new(Arc::clone(&fixture.experience));
        let mut ctx = MissionSagaContext::new(USER_ID, 1, false, false);
        ctx.user_exp_earned = 30;
        fixture.experience.set_total(USER_ID, 90);

        let result = step.execute(&mut ctx);
        assert!(result.is_success(), "{}", result.message());
        (step, ctx)
    }

    #[test]
    fn grant_records_levels_and_payload() {
        let fixture = Fixture::new();
        let (_step, ctx) = granted_context(&fixture);

        assert_eq!(fixture.experience.state(USER_ID).total_exp, 120);
        assert_eq!(ctx.user_level_before, Some(1));
        assert_eq!(ctx.user_level_after, Some(2));
        assert!(ctx.leveled_up());
        assert_eq!(ctx.compensation_data(keys::USER_EXP_BEFORE), Some(90));
        assert_eq!(ctx.compensation_data(keys::USER_EXP_AFTER), Some(120));
    }

    #[test]
    fn compensating_twice_subtracts_once() {
        let fixture = Fixture::new();
        let (step, mut ctx) = granted_context(&fixture);

        let first = step.compensate(&mut ctx);
        let second = step.compensate(&mut ctx);

        assert!(first.is_success());
        assert!(second.is_success());
        assert_eq!(second.message(), "user experience already reverted");
        assert_eq!(fixture.experience.state(USER_ID).total_exp, 90);
        assert_eq!(fixture.log.matching("experience.subtract").len(), 1);
    }

    #[test]
    fn concurrent_change_blocks_compensation() {
        let fixture = Fixture::new();
        let (step, mut ctx) = granted_context(&fixture);
        fixture.experience.set_total(USER_ID, 175);

        let result = step.compensate(&mut ctx);

        assert!(result.is_failure());
        assert!(matches!(
            result.cause(),
            Some(OperationError::ConcurrentModification { .. })
        ));
        assert_eq!(fixture.experience.state(USER_ID).total_exp, 175);
        assert!(fixture.log.matching("experience.subtract").is_empty());
    }

    #[test]
    fn zero_reward_grants_nothing_and_compensates_nothing() {
        let fixture = Fixture::new();
        let step = GrantUserExperienceStep::new(Arc::clone(&fixture.experience));
        let mut ctx = MissionSagaContext::new(USER_ID, 1, false, false);

        assert!(step.execute(&mut ctx).is_success());
        assert!(step.compensate(&mut ctx).is_success());
        assert!(fixture.log.entries().is_empty());
    }
}
