use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::operation::MissionServices;
use crate::traits::{
    ExecutionRepository, ExperienceService, FeedService, GuildService, InstanceRepository,
    MissionRepository, SharedFlagUpdater,
};
use crate::types::{
    CompletionTarget, ExecutionStatus, ExperienceGrant, ExperienceState, Feed, FeedDraft,
    GuildExpInfo, GuildExpSource, Mission, MissionExecution, MissionInstance, MissionParticipant,
    ParticipantStatus,
};
use crate::{OperationError, Result};

/// Calls made to every mock of one fixture, in order.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    fn record(&self, entry: impl Into<String>) {
        self.0.lock().expect("call log lock").push(entry.into());
    }

    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().expect("call log lock").clone()
    }

    /// Entries starting with `prefix`, in order.
    #[must_use]
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.starts_with(prefix))
            .collect()
    }
}

/// Number of upcoming calls that should fail.
#[derive(Default)]
struct FailureBudget(AtomicU32);

impl FailureBudget {
    fn set(&self, count: u32) {
        self.0.store(count, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

/// Errors handed out, one per call, ahead of the mock's normal behavior.
#[derive(Default)]
struct InjectedErrors(Mutex<VecDeque<OperationError>>);

impl InjectedErrors {
    fn push(&self, err: OperationError) {
        self.0.lock().expect("injected errors lock").push_back(err);
    }

    fn next(&self) -> Option<OperationError> {
        self.0.lock().expect("injected errors lock").pop_front()
    }
}

fn level_for(total_exp: i64, per_level: i64) -> u32 {
    u32::try_from(total_exp.max(0) / per_level).unwrap_or(u32::MAX - 1) + 1
}

pub struct MockExperienceService {
    users: Mutex<HashMap<String, ExperienceState>>,
    grant_failures: FailureBudget,
    subtract_failures: FailureBudget,
    log: CallLog,
}

impl MockExperienceService {
    #[must_use]
    pub fn new(log: CallLog) -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            grant_failures: FailureBudget::default(),
            subtract_failures: FailureBudget::default(),
            log,
        }
    }

    pub fn set_total(&self, user_id: &str, total_exp: i64) {
        self.users.lock().expect("users lock").insert(
            user_id.to_string(),
            ExperienceState {
                user_id: user_id.to_string(),
                level: level_for(total_exp, 100),
                total_exp,
            },
        );
    }

    pub fn fail_grants(&self, count: u32) {
        self.grant_failures.set(count);
    }

    pub fn fail_subtracts(&self, count: u32) {
        self.subtract_failures.set(count);
    }

    #[must_use]
    pub fn state(&self, user_id: &str) -> ExperienceState {
        self.users
            .lock()
            .expect("users lock")
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| ExperienceState {
                user_id: user_id.to_string(),
                level: 1,
                total_exp: 0,
            })
    }

    fn apply(&self, user_id: &str, delta: i64) -> ExperienceState {
        let total = self.state(user_id).total_exp + delta;
        self.set_total(user_id, total);
        self.state(user_id)
    }
}

impl ExperienceService for MockExperienceService {
    fn current(&self, user_id: &str) -> Result<ExperienceState> {
        self.log.record(format!("experience.current {user_id}"));
        Ok(self.state(user_id))
    }

    fn grant(&self, grant: &ExperienceGrant) -> Result<ExperienceState> {
        self.log
            .record(format!("experience.grant {} {}", grant.user_id, grant.amount));
        if self.grant_failures.take() {
            return Err(OperationError::collaborator("experience", "grant rejected"));
        }
        Ok(self.apply(&grant.user_id, grant.amount))
    }

    fn subtract(&self, grant: &ExperienceGrant) -> Result<ExperienceState> {
        self.log
            .record(format!("experience.subtract {} {}", grant.user_id, grant.amount));
        if self.subtract_failures.take() {
            return Err(OperationError::collaborator("experience", "subtract rejected"));
        }
        Ok(self.apply(&grant.user_id, -grant.amount))
    }
}

pub struct MockGuildService {
    totals: Mutex<HashMap<i64, i64>>,
    add_failures: FailureBudget,
    log: CallLog,
}

impl MockGuildService {
    #[must_use]
    pub fn new(log: CallLog) -> Self {
        Self {
            totals: Mutex::new(HashMap::new()),
            add_failures: FailureBudget::default(),
            log,
        }
    }

    pub fn set_total(&self, guild_id: i64, total_exp: i64) {
        self.totals
            .lock()
            .expect("guilds lock")
            .insert(guild_id, total_exp);
    }

    pub fn fail_adds(&self, count: u32) {
        self.add_failures.set(count);
    }

    #[must_use]
    pub fn info(&self, guild_id: i64) -> GuildExpInfo {
        let total_exp = self
            .totals
            .lock()
            .expect("guilds lock")
            .get(&guild_id)
            .copied()
            .unwrap_or_default();
        GuildExpInfo {
            guild_id,
            current_level: level_for(total_exp, 200),
            current_exp: total_exp % 200,
            total_exp,
        }
    }
}

impl GuildService for MockGuildService {
    fn exp_info(&self, guild_id: i64) -> Result<GuildExpInfo> {
        self.log.record(format!("guild.exp_info {guild_id}"));
        Ok(self.info(guild_id))
    }

    fn add_experience(
        &self,
        guild_id: i64,
        amount: i64,
        source: &GuildExpSource,
    ) -> Result<GuildExpInfo> {
        self.log.record(format!(
            "guild.add {guild_id} {amount} mission {}",
            source.mission_id
        ));
        if self.add_failures.take() {
            return Err(OperationError::collaborator("guild", "deadlock detected"));
        }
        let total = self.info(guild_id).total_exp + amount;
        self.set_total(guild_id, total);
        Ok(self.info(guild_id))
    }

    fn subtract_experience(
        &self,
        guild_id: i64,
        amount: i64,
        source: &GuildExpSource,
    ) -> Result<GuildExpInfo> {
        self.log.record(format!(
            "guild.subtract {guild_id} {amount} mission {}",
            source.mission_id
        ));
        let total = self.info(guild_id).total_exp - amount;
        self.set_total(guild_id, total);
        Ok(self.info(guild_id))
    }
}

pub struct MockFeedService {
    next_id: AtomicI64,
    feeds: Mutex<Vec<Feed>>,
    create_failures: FailureBudget,
    create_errors: InjectedErrors,
    log: CallLog,
}

impl MockFeedService {
    /// Feeds are numbered from 42.
    #[must_use]
    pub fn new(log: CallLog) -> Self {
        Self {
            next_id: AtomicI64::new(42),
            feeds: Mutex::new(Vec::new()),
            create_failures: FailureBudget::default(),
            create_errors: InjectedErrors::default(),
            log,
        }
    }

    pub fn fail_creates(&self, count: u32) {
        self.create_failures.set(count);
    }

    /// The next create returns `err`.
    pub fn reject_create_with(&self, err: OperationError) {
        self.create_errors.push(err);
    }

    #[must_use]
    pub fn feed_ids(&self) -> Vec<i64> {
        self.feeds
            .lock()
            .expect("feeds lock")
            .iter()
            .map(|feed| feed.id)
            .collect()
    }
}

impl FeedService for MockFeedService {
    fn create_mission_shared_feed(&self, draft: &FeedDraft) -> Result<Feed> {
        self.log
            .record(format!("feed.create mission {}", draft.mission_id));
        if let Some(err) = self.create_errors.next() {
            return Err(err);
        }
        if self.create_failures.take() {
            return Err(OperationError::collaborator("feed", "service unavailable"));
        }
        let feed = Feed {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            user_id: draft.user_id.clone(),
            mission_id: draft.mission_id,
        };
        self.feeds.lock().expect("feeds lock").push(feed.clone());
        Ok(feed)
    }

    fn delete_feed_by_id(&self, feed_id: i64) -> Result<()> {
        self.log.record(format!("feed.delete {feed_id}"));
        self.feeds
            .lock()
            .expect("feeds lock")
            .retain(|feed| feed.id != feed_id);
        Ok(())
    }
}

pub struct MockSharedFlagUpdater {
    updates: Mutex<Vec<(CompletionTarget, bool)>>,
    failures: FailureBudget,
    errors: InjectedErrors,
    log: CallLog,
}

impl MockSharedFlagUpdater {
    #[must_use]
    pub fn new(log: CallLog) -> Self {
        Self {
            updates: Mutex::new(Vec::new()),
            failures: FailureBudget::default(),
            errors: InjectedErrors::default(),
            log,
        }
    }

    pub fn fail_updates(&self, count: u32) {
        self.failures.set(count);
    }

    /// The next update returns `err`.
    pub fn reject_update_with(&self, err: OperationError) {
        self.errors.push(err);
    }

    /// Latest flag written for `target`, if any.
    #[must_use]
    pub fn flag(&self, target: CompletionTarget) -> Option<bool> {
        self.updates
            .lock()
            .expect("updates lock")
            .iter()
            .rev()
            .find(|(written, _)| *written == target)
            .map(|(_, shared)| *shared)
    }
}

impl SharedFlagUpdater for MockSharedFlagUpdater {
    fn set_shared(&self, target: CompletionTarget, shared: bool) -> Result<()> {
        self.log.record(format!("shared.set {target:?} {shared}"));
        if let Some(err) = self.errors.next() {
            return Err(err);
        }
        if self.failures.take() {
            return Err(OperationError::collaborator("shared flag", "write conflict"));
        }
        self.updates
            .lock()
            .expect("updates lock")
            .push((target, shared));
        Ok(())
    }
}

pub struct MockMissionRepository {
    missions: Mutex<HashMap<i64, Mission>>,
    participants: Mutex<HashMap<i64, MissionParticipant>>,
    log: CallLog,
}

impl MockMissionRepository {
    #[must_use]
    pub fn new(log: CallLog) -> Self {
        Self {
            missions: Mutex::new(HashMap::new()),
            participants: Mutex::new(HashMap::new()),
            log,
        }
    }

    pub fn insert_mission(&self, mission: Mission) {
        self.missions
            .lock()
            .expect("missions lock")
            .insert(mission.id, mission);
    }

    pub fn insert_participant(&self, participant: MissionParticipant) {
        self.participants
            .lock()
            .expect("participants lock")
            .insert(participant.id, participant);
    }

    #[must_use]
    pub fn participant(&self, participant_id: i64) -> Option<MissionParticipant> {
        self.participants
            .lock()
            .expect("participants lock")
            .get(&participant_id)
            .cloned()
    }
}

impl MissionRepository for MockMissionRepository {
    fn find_mission(&self, mission_id: i64) -> Result<Option<Mission>> {
        Ok(self
            .missions
            .lock()
            .expect("missions lock")
            .get(&mission_id)
            .cloned())
    }

    fn find_participant(
        &self,
        mission_id: i64,
        user_id: &str,
    ) -> Result<Option<MissionParticipant>> {
        Ok(self
            .participants
            .lock()
            .expect("participants lock")
            .values()
            .find(|p| p.mission_id == mission_id && p.user_id == user_id)
            .cloned())
    }

    fn save_participant(&self, participant: &MissionParticipant) -> Result<()> {
        self.log.record(format!(
            "missions.save_participant {} {}",
            participant.id, participant.progress
        ));
        self.insert_participant(participant.clone());
        Ok(())
    }
}

pub struct MockExecutionRepository {
    executions: Mutex<HashMap<i64, MissionExecution>>,
    count_failures: FailureBudget,
    save_failures: FailureBudget,
    lost_claims: FailureBudget,
    log: CallLog,
}

impl MockExecutionRepository {
    #[must_use]
    pub fn new(log: CallLog) -> Self {
        Self {
            executions: Mutex::new(HashMap::new()),
            count_failures: FailureBudget::default(),
            save_failures: FailureBudget::default(),
            lost_claims: FailureBudget::default(),
            log,
        }
    }

    pub fn insert(&self, execution: MissionExecution) {
        self.executions
            .lock()
            .expect("executions lock")
            .insert(execution.id, execution);
    }

    pub fn fail_counts(&self, count: u32) {
        self.count_failures.set(count);
    }

    pub fn fail_saves(&self, count: u32) {
        self.save_failures.set(count);
    }

    /// The next claim reports that another request completed the execution first.
    pub fn lose_next_claim(&self) {
        self.lost_claims.set(1);
    }

    /// Overwrites a status behind the saga's back.
    pub fn set_status(&self, execution_id: i64, status: ExecutionStatus) {
        if let Some(execution) = self
            .executions
            .lock()
            .expect("executions lock")
            .get_mut(&execution_id)
        {
            execution.status = status;
        }
    }

    #[must_use]
    pub fn status(&self, execution_id: i64) -> Option<ExecutionStatus> {
        self.executions
            .lock()
            .expect("executions lock")
            .get(&execution_id)
            .map(|execution| execution.status)
    }
}

impl ExecutionRepository for MockExecutionRepository {
    fn find_by_id(&self, execution_id: i64) -> Result<Option<MissionExecution>> {
        Ok(self
            .executions
            .lock()
            .expect("executions lock")
            .get(&execution_id)
            .cloned())
    }

    fn find_in_progress(&self, participant_id: i64) -> Result<Option<MissionExecution>> {
        let executions = self.executions.lock().expect("executions lock");
        Ok(executions
            .values()
            .filter(|e| {
                e.participant_id == participant_id && e.status == ExecutionStatus::InProgress
            })
            .min_by_key(|e| e.id)
            .cloned())
    }

    fn save(&self, execution: &MissionExecution) -> Result<()> {
        self.log.record(format!(
            "executions.save {} {:?}",
            execution.id, execution.status
        ));
        if self.save_failures.take() {
            return Err(OperationError::collaborator("executions", "connection reset"));
        }
        self.insert(execution.clone());
        Ok(())
    }

    fn complete_if_in_progress(&self, execution_id: i64) -> Result<bool> {
        self.log.record(format!("executions.complete {execution_id}"));
        if self.lost_claims.take() {
            return Ok(false);
        }
        let mut executions = self.executions.lock().expect("executions lock");
        match executions.get_mut(&execution_id) {
            Some(execution) if execution.status == ExecutionStatus::InProgress => {
                execution.status = ExecutionStatus::Completed;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn count_by_status(&self, participant_id: i64, status: ExecutionStatus) -> Result<u32> {
        if self.count_failures.take() {
            return Err(OperationError::collaborator("executions", "read timeout"));
        }
        let executions = self.executions.lock().expect("executions lock");
        let count = executions
            .values()
            .filter(|e| e.participant_id == participant_id && e.status == status)
            .count();
        Ok(u32::try_from(count).expect("count fits in u32"))
    }
}

pub struct MockInstanceRepository {
    instances: Mutex<HashMap<i64, MissionInstance>>,
    log: CallLog,
}

impl MockInstanceRepository {
    #[must_use]
    pub fn new(log: CallLog) -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
            log,
        }
    }

    pub fn insert(&self, instance: MissionInstance) {
        self.instances
            .lock()
            .expect("instances lock")
            .insert(instance.id, instance);
    }

    pub fn set_status(&self, instance_id: i64, status: ExecutionStatus) {
        if let Some(instance) = self
            .instances
            .lock()
            .expect("instances lock")
            .get_mut(&instance_id)
        {
            instance.status = status;
        }
    }

    #[must_use]
    pub fn status(&self, instance_id: i64) -> Option<ExecutionStatus> {
        self.instances
            .lock()
            .expect("instances lock")
            .get(&instance_id)
            .map(|instance| instance.status)
    }
}

impl InstanceRepository for MockInstanceRepository {
    fn find_by_id(&self, instance_id: i64) -> Result<Option<MissionInstance>> {
        Ok(self
            .instances
            .lock()
            .expect("instances lock")
            .get(&instance_id)
            .cloned())
    }

    fn save(&self, instance: &MissionInstance) -> Result<()> {
        self.log.record(format!(
            "instances.save {} {:?}",
            instance.id, instance.status
        ));
        self.insert(instance.clone());
        Ok(())
    }

    fn complete_if_in_progress(&self, instance_id: i64) -> Result<bool> {
        self.log.record(format!("instances.complete {instance_id}"));
        let mut instances = self.instances.lock().expect("instances lock");
        match instances.get_mut(&instance_id) {
            Some(instance) if instance.status == ExecutionStatus::InProgress => {
                instance.status = ExecutionStatus::Completed;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

pub const USER_ID: &str = "user-1";
pub const MISSION_ID: i64 = 100;
pub const PARTICIPANT_ID: i64 = 10;
pub const EXECUTION_ID: i64 = 500;
pub const INSTANCE_ID: i64 = 900;
pub const GUILD_ID: i64 = 7;

pub type MockServices = MissionServices<
    MockExperienceService,
    MockGuildService,
    MockFeedService,
    MockSharedFlagUpdater,
    MockMissionRepository,
    MockExecutionRepository,
    MockInstanceRepository,
>;

/// One user with one in-progress execution of a single-execution mission
/// worth 30 experience, plus a pinned instance of the same mission.
pub struct Fixture {
    pub log: CallLog,
    pub experience: Arc<MockExperienceService>,
    pub guilds: Arc<MockGuildService>,
    pub feeds: Arc<MockFeedService>,
    pub shared_flags: Arc<MockSharedFlagUpdater>,
    pub missions: Arc<MockMissionRepository>,
    pub executions: Arc<MockExecutionRepository>,
    pub instances: Arc<MockInstanceRepository>,
}

impl Fixture {
    #[must_use]
    pub fn new() -> Self {
        let log = CallLog::default();
        let fixture = Self {
            experience: Arc::new(MockExperienceService::new(log.clone())),
            guilds: Arc::new(MockGuildService::new(log.clone())),
            feeds: Arc::new(MockFeedService::new(log.clone())),
            shared_flags: Arc::new(MockSharedFlagUpdater::new(log.clone())),
            missions: Arc::new(MockMissionRepository::new(log.clone())),
            executions: Arc::new(MockExecutionRepository::new(log.clone())),
            instances: Arc::new(MockInstanceRepository::new(log.clone())),
            log,
        };

        fixture.missions.insert_mission(Self::mission(None));
        fixture.missions.insert_participant(MissionParticipant {
            id: PARTICIPANT_ID,
            mission_id: MISSION_ID,
            user_id: USER_ID.to_string(),
            status: ParticipantStatus::InProgress,
            progress: 0,
        });
        fixture.executions.insert(MissionExecution {
            id: EXECUTION_ID,
            participant_id: PARTICIPANT_ID,
            mission_id: MISSION_ID,
            user_id: USER_ID.to_string(),
            status: ExecutionStatus::InProgress,
            shared_to_feed: false,
        });
        fixture.instances.insert(MissionInstance {
            id: INSTANCE_ID,
            mission_id: MISSION_ID,
            user_id: USER_ID.to_string(),
            status: ExecutionStatus::InProgress,
            shared_to_feed: false,
        });
        fixture
    }

    /// Same fixture, but the mission belongs to guild 7 and grants it 20
    /// experience.
    #[must_use]
    pub fn guild() -> Self {
        let fixture = Self::new();
        fixture
            .missions
            .insert_mission(Self::mission(Some(GUILD_ID)));
        fixture.guilds.set_total(GUILD_ID, 150);
        fixture
    }

    fn mission(guild_id: Option<i64>) -> Mission {
        Mission {
            id: MISSION_ID,
            title: "Morning run".to_string(),
            description: "Run 5km before 9am".to_string(),
            creator_id: "creator".to_string(),
            category_id: Some(2),
            category_name: Some("Health".to_string()),
            guild_id,
            exp_per_completion: 30,
            guild_exp_per_completion: if guild_id.is_some() { 20 } else { 0 },
            total_executions: 1,
        }
    }

    #[must_use]
    pub fn services(&self) -> MockServices {
        MissionServices {
            experience: Arc::clone(&self.experience),
            guild: Arc::clone(&self.guilds),
            feed: Arc::clone(&self.feeds),
            shared_flags: Arc::clone(&self.shared_flags),
            missions: Arc::clone(&self.missions),
            executions: Arc::clone(&self.executions),
            instances: Arc::clone(&self.instances),
        }
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
