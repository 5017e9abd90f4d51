//! Data model of the feed pipeline
//!
//! Types flow through the pipeline in this order:
//! [`Channel`] → [`VideoListing`] → [`EnrichmentOutcome`] → [`FeedItem`] → [`Feed`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::FeedError;

/// A content publisher resolved from a channel query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub last_resolved_at: DateTime<Utc>,
}

impl Channel {
    /// Public page of the channel on the video platform
    pub fn page_url(&self) -> String {
        format!("https://www.youtube.com/channel/{}", self.id)
    }
}

/// Basic metadata of one video as returned by the upstream listing call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoListing {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub published_at: Option<DateTime<Utc>>,
    pub thumbnail_url: Option<String>,
    pub channel_id: String,
}

/// Playback metadata resolved separately for each video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoEnrichment {
    pub video_id: String,
    pub duration: Duration,
    pub media_url: String,
    pub content_length: u64,
    pub content_type: String,
}

/// Why a single video could not be enriched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentFailure {
    pub video_id: String,
    pub cause: FeedError,
}

/// Result of enriching one video
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentOutcome {
    Enriched(VideoEnrichment),
    Failed(EnrichmentFailure),
}

impl EnrichmentOutcome {
    pub fn failed(video_id: impl Into<String>, cause: FeedError) -> Self {
        Self::Failed(EnrichmentFailure {
            video_id: video_id.into(),
            cause,
        })
    }

    pub fn video_id(&self) -> &str {
        match self {
            Self::Enriched(enrichment) => &enrichment.video_id,
            Self::Failed(failure) => &failure.video_id,
        }
    }

    pub fn is_enriched(&self) -> bool {
        matches!(self, Self::Enriched(_))
    }

    pub fn enrichment(&self) -> Option<&VideoEnrichment> {
        match self {
            Self::Enriched(enrichment) => Some(enrichment),
            Self::Failed(_) => None,
        }
    }
}

/// Media details returned by a probe of the media URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDetails {
    pub content_type: String,
    pub content_length: u64,
}

/// A listed video joined with its enrichment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub thumbnail_url: Option<String>,
    pub media_url: String,
    pub content_length: u64,
    pub content_type: String,
    pub duration: Duration,
    /// Position in the upstream listing; only used as a sort tie-breaker
    pub order: usize,
}

/// An assembled feed for one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feed {
    pub channel: Channel,
    pub items: Vec<FeedItem>,
    pub last_build_date: Option<DateTime<Utc>>,
}

/// Sort items newest first, keeping listing order for equal timestamps
pub(crate) fn sort_by_recency(items: &mut [FeedItem]) {
    items.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.order.cmp(&b.order))
    });
}
