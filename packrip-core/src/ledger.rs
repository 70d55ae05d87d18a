use crate::error::Result;
use crate::types::{Item, LeaderboardEntry, ViewerRecord};
use async_trait::async_trait;

/// Durable per-viewer card collections.
///
/// `append` is the only mutation. Implementations recompute the total value
/// from every stored card on each append and serialize concurrent writers.
#[async_trait]
pub trait CollectionLedger: Send + Sync {
    async fn append(&self, channel_id: &str, viewer_id: &str, item: &Item) -> Result<ViewerRecord>;

    /// The viewer's record, or an empty one if they own nothing yet.
    async fn get(&self, channel_id: &str, viewer_id: &str) -> Result<ViewerRecord>;

    /// Viewers ordered by total value, highest first. Ties go to whoever
    /// appeared in the channel first.
    async fn top_n(&self, channel_id: &str, n: usize) -> Result<Vec<LeaderboardEntry>>;
}
