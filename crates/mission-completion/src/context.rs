use mission_saga::{CompensationData, CompensationKey};

use crate::types::{
    CompletionTarget, Mission, MissionExecution, MissionInstance, MissionParticipant,
};

/// Keys for the before/after snapshots steps record for compensation.
pub mod keys {
    use mission_saga::CompensationKey;

    use crate::types::{ExecutionStatus, ParticipantStatus};

    pub const USER_EXP_BEFORE: CompensationKey<i64> = CompensationKey::new("USER_EXP_BEFORE");
    pub const USER_EXP_AFTER: CompensationKey<i64> = CompensationKey::new("USER_EXP_AFTER");
    pub const USER_LEVEL_BEFORE: CompensationKey<u32> = CompensationKey::new("USER_LEVEL_BEFORE");
    pub const USER_EXP_GRANTED: CompensationKey<i64> = CompensationKey::new("USER_EXP_GRANTED");

    pub const GUILD_EXP_BEFORE: CompensationKey<i64> = CompensationKey::new("GUILD_EXP_BEFORE");
    pub const GUILD_EXP_AFTER: CompensationKey<i64> = CompensationKey::new("GUILD_EXP_AFTER");
    pub const GUILD_LEVEL_BEFORE: CompensationKey<u32> =
        CompensationKey::new("GUILD_LEVEL_BEFORE");
    pub const GUILD_EXP_GRANTED: CompensationKey<i64> = CompensationKey::new("GUILD_EXP_GRANTED");

    pub const PARTICIPANT_PROGRESS_BEFORE: CompensationKey<u8> =
        CompensationKey::new("PARTICIPANT_PROGRESS_BEFORE");
    pub const PARTICIPANT_PROGRESS_AFTER: CompensationKey<u8> =
        CompensationKey::new("PARTICIPANT_PROGRESS_AFTER");
    pub const PARTICIPANT_STATUS_BEFORE: CompensationKey<ParticipantStatus> =
        CompensationKey::new("PARTICIPANT_STATUS_BEFORE");
    pub const PARTICIPANT_STATUS_AFTER: CompensationKey<ParticipantStatus> =
        CompensationKey::new("PARTICIPANT_STATUS_AFTER");

    /// Status of the execution (regular) or instance (pinned) before completion.
    pub const INSTANCE_STATUS_BEFORE: CompensationKey<ExecutionStatus> =
        CompensationKey::new("INSTANCE_STATUS_BEFORE");
    /// Written only once the completion has been claimed.
    pub const INSTANCE_STATUS_AFTER: CompensationKey<ExecutionStatus> =
        CompensationKey::new("INSTANCE_STATUS_AFTER");
}

/// State shared by all steps of one mission-completion run.
///
/// The request fields are fixed at construction. The load step fills the
/// mission data; later steps accumulate results and record compensation
/// snapshots.
#[derive(Debug)]
pub struct MissionSagaContext {
    pub user_id: String,
    /// Mission id for a regular mission, instance id for a pinned one.
    pub target_id: i64,
    pub pinned: bool,
    pub share_to_feed: bool,
    pub is_guild_mission: bool,

    pub mission: Option<Mission>,
    pub participant: Option<MissionParticipant>,
    pub execution: Option<MissionExecution>,
    pub instance: Option<MissionInstance>,

    pub guild_id: Option<i64>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub title: String,
    pub description: String,

    pub user_exp_earned: i64,
    pub guild_exp_earned: i64,
    pub user_level_before: Option<u32>,
    pub user_level_after: Option<u32>,
    pub progress: Option<u8>,
    pub created_feed_id: Option<i64>,

    compensation: CompensationData,
}

impl MissionSagaContext {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        target_id: i64,
        pinned: bool,
        share_to_feed: bool,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            target_id,
            pinned,
            share_to_feed,
            is_guild_mission: false,
            mission: None,
            participant: None,
            execution: None,
            instance: None,
            guild_id: None,
            category_id: None,
            category_name: None,
            title: String::new(),
            description: String::new(),
            user_exp_earned: 0,
            guild_exp_earned: 0,
            user_level_before: None,
            user_level_after: None,
            progress: None,
            created_feed_id: None,
            compensation: CompensationData::new(),
        }
    }

    /// Copies the mission's display data and rewards into the context.
    pub fn apply_mission(&mut self, mission: Mission) {
        self.is_guild_mission = mission.is_guild_mission();
        self.guild_id = mission.guild_id;
        self.category_id = mission.category_id;
        self.category_name.clone_from(&mission.category_name);
        self.title.clone_from(&mission.title);
        self.description.clone_from(&mission.description);
        self.user_exp_earned = mission.exp_per_completion;
        self.guild_exp_earned = if self.is_guild_mission {
            mission.guild_exp_per_completion
        } else {
            0
        };
        self.mission = Some(mission);
    }

    /// The mission id, once loaded.
    #[must_use]
    pub fn mission_id(&self) -> Option<i64> {
        self.mission.as_ref().map(|mission| mission.id)
    }

    /// The record whose `shared_to_feed` flag tracks this completion.
    #[must_use]
    pub fn completion_target(&self) -> Option<CompletionTarget> {
        if self.pinned {
            self.instance
                .as_ref()
                .map(|instance| CompletionTarget::Instance(instance.id))
        } else {
            self.execution
                .as_ref()
                .map(|execution| CompletionTarget::Execution(execution.id))
        }
    }

    #[must_use]
    pub fn leveled_up(&self) -> bool {
        matches!(
            (self.user_level_before, self.user_level_after),
            (Some(before), Some(after)) if after > before
        )
    }

    pub fn add_compensation_data<T>(&mut self, key: CompensationKey<T>, value: T)
    where
        T: Clone + Send + 'static,
    {
        self.compensation.insert(key, value);
    }

    #[must_use]
    pub fn compensation_data<T>(&self, key: CompensationKey<T>) -> Option<T>
    where
        T: Clone + Send + 'static,
    {
        self.compensation.get(key)
    }

    pub fn clear_compensation_data<T>(&mut self, key: CompensationKey<T>) {
        self.compensation.remove(key);
    }

    #[must_use]
    pub fn has_compensation_data<T>(&self, key: CompensationKey<T>) -> bool {
        self.compensation.contains(key)
    }
}
