use crate::Result;
use crate::types::{ExperienceGrant, ExperienceState};

/// Grants and takes back user experience.
///
/// Each call commits on its own; the saga undoes a grant by subtracting the
/// same amount.
pub trait ExperienceService: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the user's experience cannot be read.
    fn current(&self, user_id: &str) -> Result<ExperienceState>;

    /// Adds `grant.amount` and returns the resulting state, including any
    /// level-up.
    ///
    /// # Errors
    ///
    /// Returns an error if the grant cannot be committed.
    fn grant(&self, grant: &ExperienceGrant) -> Result<ExperienceState>;

    /// Removes `grant.amount`, recomputing the level.
    ///
    /// # Errors
    ///
    /// Returns an error if the subtraction cannot be committed.
    fn subtract(&self, grant: &ExperienceGrant) -> Result<ExperienceState>;
}
