//! Feed pipeline services
//!
//! - [`channel_directory`]: query → channel, cached
//! - [`video_lister`]: channel → recent videos
//! - [`enricher`]: bounded concurrent per-video metadata resolution
//! - [`feed_service`]: request orchestration, feed cache and stale fallback

pub mod channel_directory;
pub mod enricher;
pub mod feed_service;
pub mod video_lister;

pub use channel_directory::ChannelDirectory;
pub use enricher::VideoEnricher;
pub use feed_service::{FeedResponse, FeedService};
pub use video_lister::VideoLister;
