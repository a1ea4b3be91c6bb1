use std::sync::Arc;

use mission_saga::{Saga, SagaAuditLog, SagaBuilder, SagaReport};
use tracing::{debug, warn};

use crate::config::CompletionConfig;
use crate::context::MissionSagaContext;
use crate::steps::{
    CompleteMissionInstanceStep, CreateFeedFromMissionStep, GrantGuildExperienceStep,
    GrantUserExperienceStep, LoadMissionDataStep, UpdateParticipantProgressStep,
};
use crate::traits::{
    ExecutionRepository, ExperienceService, FeedService, GuildService, InstanceRepository,
    MissionRepository, SharedFlagUpdater,
};
use crate::{OperationError, Result};

/// Collaborators a mission completion talks to.
pub struct MissionServices<X, G, F, S, M, E, I> {
    pub experience: Arc<X>,
    pub guild: Arc<G>,
    pub feed: Arc<F>,
    pub shared_flags: Arc<S>,
    pub missions: Arc<M>,
    pub executions: Arc<E>,
    pub instances: Arc<I>,
}

impl<X, G, F, S, M, E, I> Clone for MissionServices<X, G, F, S, M, E, I> {
    fn clone(&self) -> Self {
        Self {
            experience: Arc::clone(&self.experience),
            guild: Arc::clone(&self.guild),
            feed: Arc::clone(&self.feed),
            shared_flags: Arc::clone(&self.shared_flags),
            missions: Arc::clone(&self.missions),
            executions: Arc::clone(&self.executions),
            instances: Arc::clone(&self.instances),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteMissionInput {
    pub user_id: String,
    /// Mission id for a regular mission, instance id for a pinned one.
    pub target_id: i64,
    pub pinned: bool,
    pub share_to_feed: bool,
}

/// What a successful completion reports back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionCompletionOutput {
    pub mission_id: i64,
    pub user_exp_earned: i64,
    pub guild_exp_earned: i64,
    pub user_level_before: Option<u32>,
    pub user_level_after: Option<u32>,
    pub leveled_up: bool,
    /// Participant progress after the completion; `None` for pinned missions.
    pub progress: Option<u8>,
    pub guild_id: Option<i64>,
    pub feed_id: Option<i64>,
    pub executed_steps: Vec<&'static str>,
    pub skipped_steps: Vec<&'static str>,
    /// Why sharing to the feed failed, when it was requested but did not happen.
    pub feed_error: Option<String>,
}

impl MissionCompletionOutput {
    fn from_run(ctx: &MissionSagaContext, report: &SagaReport<OperationError>) -> Result<Self> {
        let mission_id = ctx
            .mission_id()
            .ok_or(OperationError::MissingContext("mission"))?;
        let feed_error = report
            .optional_failures()
            .iter()
            .map(|failure| failure.message.clone())
            .next();

        Ok(Self {
            mission_id,
            user_exp_earned: ctx.user_exp_earned,
            guild_exp_earned: ctx.guild_exp_earned,
            user_level_before: ctx.user_level_before,
            user_level_after: ctx.user_level_after,
            leveled_up: ctx.leveled_up(),
            progress: ctx.progress,
            guild_id: ctx.guild_id,
            feed_id: ctx.created_feed_id,
            executed_steps: report.executed().to_vec(),
            skipped_steps: report.skipped().to_vec(),
            feed_error,
        })
    }
}

/// Completes a mission execution (or pinned instance) as one saga: load and
/// validate, grant user experience, record progress or complete the
/// instance, grant guild experience, and optionally share to the feed.
pub struct CompleteMissionOperation<X, G, F, S, M, E, I> {
    services: MissionServices<X, G, F, S, M, E, I>,
    config: CompletionConfig,
}

impl<X, G, F, S, M, E, I> CompleteMissionOperation<X, G, F, S, M, E, I>
where
    X: ExperienceService + 'static,
    G: GuildService + 'static,
    F: FeedService + 'static,
    S: SharedFlagUpdater + 'static,
    M: MissionRepository + 'static,
    E: ExecutionRepository + 'static,
    I: InstanceRepository + 'static,
{
    /// # Errors
    ///
    /// Returns `OperationError::UnknownStep` if the config tunes a step the
    /// completion does not have.
    pub fn new(
        services: MissionServices<X, G, F, S, M, E, I>,
        config: CompletionConfig,
    ) -> Result<Self> {
        let operation = Self { services, config };
        operation
            .config
            .validate(&operation.build_saga().step_names())?;
        Ok(operation)
    }

    /// Step names in execution order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&'static str> {
        self.build_saga().step_names()
    }

    /// # Errors
    ///
    /// Returns `OperationError::SagaFailed` naming the step that aborted the
    /// completion, or `OperationError::SagaCompensationFailed` when undoing
    /// earlier steps also failed.
    pub fn execute(&self, input: CompleteMissionInput) -> Result<MissionCompletionOutput> {
        self.execute_with_audit(input).0
    }

    /// Like [`execute`](Self::execute), also returning the per-step audit log.
    #[must_use]
    pub fn execute_with_audit(
        &self,
        input: CompleteMissionInput,
    ) -> (Result<MissionCompletionOutput>, SagaAuditLog) {
        let share_to_feed = input.share_to_feed && self.config.feed_enabled;
        let mut ctx =
            MissionSagaContext::new(input.user_id, input.target_id, input.pinned, share_to_feed);

        debug!(
            user_id = %ctx.user_id,
            target_id = ctx.target_id,
            pinned = ctx.pinned,
            share_to_feed,
            "completing mission"
        );

        let saga = self.build_saga();
        let (result, audit_log) = saga.execute_with_audit(&mut ctx);

        let output = match result {
            Ok(report) => {
                debug!(summary = %audit_log.summary(), "mission completed");
                MissionCompletionOutput::from_run(&ctx, &report)
            }
            Err(err) => {
                warn!(
                    step = err.failed_step(),
                    error = %err,
                    "mission completion rolled back"
                );
                Err(err.into())
            }
        };
        (output, audit_log)
    }

    fn build_saga(&self) -> Saga<MissionSagaContext, OperationError> {
        let services = &self.services;
        let builder = SagaBuilder::new()
            .first_step(LoadMissionDataStep::new(
                Arc::clone(&services.missions),
                Arc::clone(&services.executions),
                Arc::clone(&services.instances),
            ))
            .then(GrantUserExperienceStep::new(Arc::clone(&services.experience)))
            .then(UpdateParticipantProgressStep::new(
                Arc::clone(&services.missions),
                Arc::clone(&services.executions),
            ))
            .then(CompleteMissionInstanceStep::new(Arc::clone(
                &services.instances,
            )))
            .then(GrantGuildExperienceStep::new(Arc::clone(&services.guild)))
            .then(CreateFeedFromMissionStep::new(
                Arc::clone(&services.feed),
                Arc::clone(&services.shared_flags),
            ));

        self.config
            .retry_overrides()
            .into_iter()
            .fold(builder, |builder, (step, policy)| {
                builder.with_retry_policy(step, policy)
            })
            .build()
    }
}
