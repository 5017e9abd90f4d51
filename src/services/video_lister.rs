//! Video lister
//!
//! Thin wrapper over [`VideoProvider::list_videos`] that enforces the result
//! limit and the upstream timeout.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::defaults::MAX_RESULTS_LIMIT;
use crate::errors::{FeedError, FeedResult};
use crate::models::VideoListing;
use crate::sources::VideoProvider;

pub struct VideoLister {
    provider: Arc<dyn VideoProvider>,
    upstream_timeout: Duration,
}

impl VideoLister {
    pub fn new(provider: Arc<dyn VideoProvider>, upstream_timeout: Duration) -> Self {
        Self {
            provider,
            upstream_timeout,
        }
    }

    /// The `limit` most recent videos of `channel_id`, in provider order
    pub async fn list(&self, channel_id: &str, limit: u32) -> FeedResult<Vec<VideoListing>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = limit.min(MAX_RESULTS_LIMIT);

        let mut listings = tokio::time::timeout(
            self.upstream_timeout,
            self.provider.list_videos(channel_id, limit),
        )
        .await
        .map_err(|_| FeedError::timeout(self.provider.name(), self.upstream_timeout))??;

        listings.truncate(limit as usize);
        debug!("Listed {} videos for channel {}", listings.len(), channel_id);
        Ok(listings)
    }
}
