mod experience_service;
mod feed_service;
mod guild_service;
mod repositories;
mod shared_flag_updater;

pub use experience_service::ExperienceService;
pub use feed_service::FeedService;
pub use guild_service::GuildService;
pub use repositories::{ExecutionRepository, InstanceRepository, MissionRepository};
pub use shared_flag_updater::SharedFlagUpdater;
