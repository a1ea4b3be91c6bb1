use crate::Result;
use crate::types::{
    ExecutionStatus, Mission, MissionExecution, MissionInstance, MissionParticipant,
};

pub trait MissionRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn find_mission(&self, mission_id: i64) -> Result<Option<Mission>>;

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn find_participant(&self, mission_id: i64, user_id: &str)
    -> Result<Option<MissionParticipant>>;

    /// # Errors
    ///
    /// Returns an error if the participant cannot be written.
    fn save_participant(&self, participant: &MissionParticipant) -> Result<()>;
}

pub trait ExecutionRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn find_by_id(&self, execution_id: i64) -> Result<Option<MissionExecution>>;

    /// The participant's execution currently in progress, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn find_in_progress(&self, participant_id: i64) -> Result<Option<MissionExecution>>;

    /// # Errors
    ///
    /// Returns an error if the execution cannot be written.
    fn save(&self, execution: &MissionExecution) -> Result<()>;

    /// Atomically moves the execution from `InProgress` to `Completed`.
    ///
    /// Returns `false` when the execution was no longer in progress, which
    /// means a concurrent request completed it first.
    ///
    /// # Errors
    ///
    /// Returns an error if the execution cannot be written.
    fn complete_if_in_progress(&self, execution_id: i64) -> Result<bool>;

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn count_by_status(&self, participant_id: i64, status: ExecutionStatus) -> Result<u32>;
}

pub trait InstanceRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn find_by_id(&self, instance_id: i64) -> Result<Option<MissionInstance>>;

    /// # Errors
    ///
    /// Returns an error if the instance cannot be written.
    fn save(&self, instance: &MissionInstance) -> Result<()>;

    /// Atomically moves the instance from `InProgress` to `Completed`.
    ///
    /// Returns `false` when the instance was no longer in progress.
    ///
    /// # Errors
    ///
    /// Returns an error if the instance cannot be written.
    fn complete_if_in_progress(&self, instance_id: i64) -> Result<bool>;
}
