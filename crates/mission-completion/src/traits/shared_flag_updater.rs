use crate::Result;
use crate::types::CompletionTarget;

/// Flips the `shared_to_feed` flag on a completed execution or instance.
///
/// Implementations commit in a unit of work of their own so that the flag
/// survives (or is reverted) independently of the completion transaction.
pub trait SharedFlagUpdater: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the flag cannot be written.
    fn set_shared(&self, target: CompletionTarget, shared: bool) -> Result<()>;
}
