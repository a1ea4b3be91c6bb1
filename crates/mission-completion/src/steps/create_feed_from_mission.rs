use std::sync::Arc;

use mission_saga::{SagaStep, SagaStepResult};
use serde_json::json;
use tracing::{debug, warn};

use super::{StepResult, settle_transient};
use crate::context::MissionSagaContext;
use crate::traits::{FeedService, SharedFlagUpdater};
use crate::types::FeedDraft;
use crate::{OperationError, Result};

/// Publishes the completion to the activity feed when the user asked to
/// share it, then marks the completed record as shared.
///
/// Optional: a failure here never undoes the completion.
pub struct CreateFeedFromMissionStep<F, S> {
    feeds: Arc<F>,
    shared_flags: Arc<S>,
}

impl<F, S> CreateFeedFromMissionStep<F, S>
where
    F: FeedService,
    S: SharedFlagUpdater,
{
    #[must_use]
    pub fn new(feeds: Arc<F>, shared_flags: Arc<S>) -> Self {
        Self {
            feeds,
            shared_flags,
        }
    }

    fn draft(ctx: &MissionSagaContext) -> Result<FeedDraft> {
        Ok(FeedDraft {
            user_id: ctx.user_id.clone(),
            mission_id: ctx
                .mission_id()
                .ok_or(OperationError::MissingContext("mission"))?,
            title: ctx.title.clone(),
            description: ctx.description.clone(),
            category_name: ctx.category_name.clone(),
            exp_earned: ctx.user_exp_earned,
            user_level: ctx.user_level_after,
        })
    }

    fn publish(&self, ctx: &mut MissionSagaContext) -> Result<StepResult> {
        if !ctx.share_to_feed {
            return Ok(SagaStepResult::success("sharing to feed not requested"));
        }
        let target = ctx
            .completion_target()
            .ok_or(OperationError::MissingContext("completed record"))?;

        let feed = self.feeds.create_mission_shared_feed(&Self::draft(ctx)?)?;
        if let Err(err) = self.shared_flags.set_shared(target, true) {
            if let Err(cleanup) = self.feeds.delete_feed_by_id(feed.id) {
                warn!(
                    feed_id = feed.id,
                    error = %cleanup,
                    "failed to delete feed after shared flag update failure"
                );
            }
            return Err(err);
        }

        ctx.created_feed_id = Some(feed.id);
        debug!(feed_id = feed.id, ?target, "shared mission completion to feed");
        Ok(SagaStepResult::success_with(
            "mission shared to feed",
            json!({ "feed_id": feed.id }),
        ))
    }

    fn unpublish(&self, ctx: &mut MissionSagaContext) -> Result<StepResult> {
        let Some(feed_id) = ctx.created_feed_id else {
            return Ok(SagaStepResult::success("no feed entry was created"));
        };
        let target = ctx
            .completion_target()
            .ok_or(OperationError::MissingContext("completed record"))?;

        self.feeds.delete_feed_by_id(feed_id)?;
        ctx.created_feed_id = None;
        self.shared_flags.set_shared(target, false)?;

        debug!(feed_id, ?target, "removed shared feed entry");
        Ok(SagaStepResult::success(format!("deleted feed {feed_id}")))
    }
}

impl<F, S> SagaStep for CreateFeedFromMissionStep<F, S>
where
    F: FeedService + 'static,
    S: SharedFlagUpdater + 'static,
{
    type Context = MissionSagaContext;
    type Error = OperationError;

    fn name(&self) -> &'static str {
        "create_feed_from_mission"
    }

    fn is_mandatory(&self) -> bool {
        false
    }

    fn execute(&self, ctx: &mut Self::Context) -> StepResult {
        settle_transient(self.publish(ctx), "failed to share mission to feed")
    }

    fn compensate(&self, ctx: &mut Self::Context) -> StepResult {
        settle_transient(self.unpublish(ctx), "failed to remove shared feed entry")
    }

    fn compensation_description(&self) -> String {
        "delete the feed entry and clear the shared flag".to_string()
    }
}
