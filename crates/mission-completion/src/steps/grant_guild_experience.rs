use std::sync::Arc;

use mission_saga::{SagaStep, SagaStepResult};
use serde_json::json;
use tracing::debug;

use super::{StepResult, settle_transient};
use crate::context::{MissionSagaContext, keys};
use crate::traits::GuildService;
use crate::types::GuildExpSource;
use crate::{OperationError, Result};

/// Credits the guild of a guild mission with its share of experience.
pub struct GrantGuildExperienceStep<G> {
    guilds: Arc<G>,
}

impl<G: GuildService> GrantGuildExperienceStep<G> {
    #[must_use]
    pub fn new(guilds: Arc<G>) -> Self {
        Self { guilds }
    }

    fn source(ctx: &MissionSagaContext) -> Result<GuildExpSource> {
        Ok(GuildExpSource {
            user_id: ctx.user_id.clone(),
            mission_id: ctx
                .mission_id()
                .ok_or(OperationError::MissingContext("mission"))?,
        })
    }

    fn grant(&self, ctx: &mut MissionSagaContext) -> Result<StepResult> {
        let guild_id = ctx
            .guild_id
            .ok_or(OperationError::MissingContext("guild"))?;
        let amount = ctx.guild_exp_earned;
        if amount <= 0 {
            return Ok(SagaStepResult::success("mission grants no guild experience"));
        }
        let source = Self::source(ctx)?;

        let before = self.guilds.exp_info(guild_id)?;
        ctx.add_compensation_data(keys::GUILD_EXP_BEFORE, before.total_exp);
        ctx.add_compensation_data(keys::GUILD_LEVEL_BEFORE, before.current_level);

        let after = self.guilds.add_experience(guild_id, amount, &source)?;
        ctx.add_compensation_data(keys::GUILD_EXP_AFTER, after.total_exp);
        ctx.add_compensation_data(keys::GUILD_EXP_GRANTED, amount);

        debug!(
            guild_id,
            amount,
            level_before = before.current_level,
            level_after = after.current_level,
            "granted guild experience"
        );
        Ok(SagaStepResult::success_with(
            format!("granted {amount} guild experience"),
            json!({
                "guild_id": guild_id,
                "exp_granted": amount,
                "level_after": after.current_level,
            }),
        ))
    }

    fn revert(&self, ctx: &mut MissionSagaContext) -> Result<StepResult> {
        let (Some(guild_id), Some(before), Some(after), Some(amount)) = (
            ctx.guild_id,
            ctx.compensation_data(keys::GUILD_EXP_BEFORE),
            ctx.compensation_data(keys::GUILD_EXP_AFTER),
            ctx.compensation_data(keys::GUILD_EXP_GRANTED),
        ) else {
            return Ok(SagaStepResult::success("no guild experience was granted"));
        };

        let current = self.guilds.exp_info(guild_id)?;
        if current.total_exp == before {
            return Ok(SagaStepResult::success("guild experience already reverted"));
        }
        if current.total_exp != after {
            return Err(OperationError::ConcurrentModification {
                resource: format!("experience of guild {guild_id}"),
                expected: after.to_string(),
                found: current.total_exp.to_string(),
            });
        }

        let source = Self::source(ctx)?;
        let restored = self.guilds.subtract_experience(guild_id, amount, &source)?;
        debug!(
            guild_id,
            amount,
            level = restored.current_level,
            "reverted guild experience"
        );
        Ok(SagaStepResult::success(format!(
            "subtracted {amount} guild experience"
        )))
    }
}

impl<G> SagaStep for GrantGuildExperienceStep<G>
where
    G: GuildService + 'static,
{
    type Context = MissionSagaContext;
    type Error = OperationError;

    fn name(&self) -> &'static str {
        "grant_guild_experience"
    }

    fn should_execute(&self, ctx: &Self::Context) -> bool {
        ctx.is_guild_mission
    }

    fn execute(&self, ctx: &mut Self::Context) -> StepResult {
        settle_transient(self.grant(ctx), "failed to grant guild experience")
    }

    fn compensate(&self, ctx: &mut Self::Context) -> StepResult {
        settle_transient(self.revert(ctx), "failed to revert guild experience")
    }

    fn compensation_description(&self) -> String {
        "subtract the experience granted to the guild".to_string()
    }
}
