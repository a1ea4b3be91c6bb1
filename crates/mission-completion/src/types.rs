/// Lifecycle of a single mission execution or pinned mission instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// Lifecycle of a user's participation in a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipantStatus {
    Accepted,
    InProgress,
    Completed,
    Failed,
    Withdrawn,
}

impl ParticipantStatus {
    /// Whether the participant can still record executions.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Accepted | Self::InProgress | Self::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mission {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub creator_id: String,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    /// Set when the mission belongs to a guild.
    pub guild_id: Option<i64>,
    pub exp_per_completion: i64,
    pub guild_exp_per_completion: i64,
    /// Number of executions that make up 100% progress.
    pub total_executions: u32,
}

impl Mission {
    #[must_use]
    pub fn is_guild_mission(&self) -> bool {
        self.guild_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionParticipant {
    pub id: i64,
    pub mission_id: i64,
    pub user_id: String,
    pub status: ParticipantStatus,
    /// Completion percentage, 0 to 100.
    pub progress: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionExecution {
    pub id: i64,
    pub participant_id: i64,
    pub mission_id: i64,
    pub user_id: String,
    pub status: ExecutionStatus,
    pub shared_to_feed: bool,
}

/// A pinned (recurring) mission instance owned by one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionInstance {
    pub id: i64,
    pub mission_id: i64,
    pub user_id: String,
    pub status: ExecutionStatus,
    pub shared_to_feed: bool,
}

/// The record a completion finalizes; carries the `shared_to_feed` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionTarget {
    Execution(i64),
    Instance(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpSourceType {
    MissionExecution,
    MissionInstance,
}

/// A user's experience standing as reported by the experience service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperienceState {
    pub user_id: String,
    pub level: u32,
    pub total_exp: i64,
}

/// Experience added to (or taken back from) a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperienceGrant {
    pub user_id: String,
    pub amount: i64,
    pub source_type: ExpSourceType,
    pub source_id: i64,
    pub description: String,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuildExpInfo {
    pub guild_id: i64,
    pub current_level: u32,
    /// Experience within the current level.
    pub current_exp: i64,
    pub total_exp: i64,
}

/// Attribution recorded with guild experience changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildExpSource {
    pub user_id: String,
    pub mission_id: i64,
}

/// Input for a mission-shared activity feed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDraft {
    pub user_id: String,
    pub mission_id: i64,
    pub title: String,
    pub description: String,
    pub category_name: Option<String>,
    pub exp_earned: i64,
    pub user_level: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub id: i64,
    pub user_id: String,
    pub mission_id: i64,
}
