use crate::Result;
use crate::types::{GuildExpInfo, GuildExpSource};

pub trait GuildService: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the guild does not exist or cannot be read.
    fn exp_info(&self, guild_id: i64) -> Result<GuildExpInfo>;

    /// # Errors
    ///
    /// Returns an error if the experience cannot be committed.
    fn add_experience(
        &self,
        guild_id: i64,
        amount: i64,
        source: &GuildExpSource,
    ) -> Result<GuildExpInfo>;

    /// # Errors
    ///
    /// Returns an error if the experience cannot be committed.
    fn subtract_experience(
        &self,
        guild_id: i64,
        amount: i64,
        source: &GuildExpSource,
    ) -> Result<GuildExpInfo>;
}
