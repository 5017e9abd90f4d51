//! Source trait definitions
//!
//! These traits are the narrow seams between the pipeline and its external
//! collaborators. Implementations must be cheap to share across tasks; the
//! enricher calls them from many tasks at once through an `Arc`.

use async_trait::async_trait;

use crate::errors::FeedResult;
use crate::models::{Channel, MediaDetails, VideoListing};

/// Video hosting provider: channel lookup, listing and content details
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Provider name used in logs and error messages
    fn name(&self) -> &str;

    /// Look up a channel by canonical id or free-text query.
    ///
    /// Returns `Ok(None)` when nothing matches.
    async fn find_channel(&self, query: &str) -> FeedResult<Option<Channel>>;

    /// List the `limit` most recent videos of a channel, newest first
    async fn list_videos(&self, channel_id: &str, limit: u32) -> FeedResult<Vec<VideoListing>>;

    /// Fetch the raw duration string (e.g. `PT1H2M10S`) of one video
    async fn content_duration(&self, video_id: &str) -> FeedResult<String>;
}

/// Metadata-only request against a media URL
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, url: &str) -> FeedResult<MediaDetails>;
}
