use crate::Result;
use crate::types::{Feed, FeedDraft};

pub trait FeedService: Send + Sync {
    /// Publishes a mission-shared activity entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be created.
    fn create_mission_shared_feed(&self, draft: &FeedDraft) -> Result<Feed>;

    /// # Errors
    ///
    /// Returns an error if the entry cannot be deleted. Deleting an entry
    /// that no longer exists is not an error.
    fn delete_feed_by_id(&self, feed_id: i64) -> Result<()>;
}
