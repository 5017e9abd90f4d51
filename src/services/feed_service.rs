//! Feed service
//!
//! Orchestrates one feed request: resolve the channel, then either serve the
//! cached document or build it (list → enrich → assemble → serialize) under
//! the feed cache's single-flight guard. When a rebuild fails upstream and an
//! older document is still retained, that document is served marked as stale.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::channel_directory::ChannelDirectory;
use super::enricher::VideoEnricher;
use super::video_lister::VideoLister;
use crate::cache::{CacheStats, FeedCache, Purgeable};
use crate::config::Config;
use crate::errors::{FeedError, FeedResult};
use crate::feed::{assemble, unzip_outcomes, FeedSerializer};
use crate::models::Channel;
use crate::sources::{MediaProbe, VideoProvider};

/// A serialized feed ready to be returned to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedResponse {
    pub channel_id: String,
    pub body: Bytes,
    /// The body is an expired document served because a rebuild failed
    pub stale: bool,
}

pub struct FeedService {
    directory: ChannelDirectory,
    lister: VideoLister,
    enricher: VideoEnricher,
    serializer: FeedSerializer,
    channels: Arc<FeedCache<Channel>>,
    feeds: Arc<FeedCache<Bytes>>,
    max_results: u32,
    feed_ttl: Duration,
    serve_stale_on_error: bool,
}

impl FeedService {
    pub fn new(
        config: &Config,
        provider: Arc<dyn VideoProvider>,
        probe: Arc<dyn MediaProbe>,
    ) -> Self {
        let channels = Arc::new(FeedCache::new("channels"));
        let feeds = Arc::new(FeedCache::new("feeds"));

        let directory = ChannelDirectory::new(
            Arc::clone(&provider),
            Arc::clone(&channels),
            config.cache.channel_ttl,
            config.youtube.timeout,
        );
        let lister = VideoLister::new(Arc::clone(&provider), config.youtube.timeout);
        let enricher = VideoEnricher::new(
            provider,
            probe,
            config.feed.media_base_url(&config.web),
            config.enrichment.concurrency,
            config.enrichment.call_timeout,
            config.enrichment.request_timeout,
        );

        Self {
            directory,
            lister,
            enricher,
            serializer: FeedSerializer::new(config.feed.generator.clone()),
            channels,
            feeds,
            max_results: config.feed.max_results,
            feed_ttl: config.cache.feed_ttl,
            serve_stale_on_error: config.cache.serve_stale_on_error,
        }
    }

    /// Resolve a channel query without building its feed
    pub async fn find_channel(&self, query: &str) -> FeedResult<Channel> {
        self.directory.resolve(query).await
    }

    /// Serve the feed document for a channel query
    pub async fn feed(&self, query: &str) -> FeedResult<FeedResponse> {
        let channel = match self.directory.resolve(query).await {
            Ok(channel) => channel,
            Err(error) => {
                // A query that is itself a channel id may still have a document
                return self.stale_or(query.trim(), error);
            }
        };
        let channel_id = channel.id.clone();

        let built = self
            .feeds
            .get_or_try_populate(&channel_id, self.feed_ttl, || self.build(channel))
            .await;

        match built {
            Ok(body) => Ok(FeedResponse {
                channel_id,
                body,
                stale: false,
            }),
            Err(error) => self.stale_or(&channel_id, error),
        }
    }

    /// Drop the cached document of `channel_id`
    pub fn invalidate(&self, channel_id: &str) -> bool {
        let removed = self.feeds.invalidate(channel_id);
        if removed {
            info!("Invalidated feed for {}", channel_id);
        }
        removed
    }

    pub fn stats(&self) -> Vec<CacheStats> {
        vec![self.channels.stats(), self.feeds.stats()]
    }

    /// Caches for the background housekeeper
    pub fn caches(&self) -> Vec<Arc<dyn Purgeable>> {
        vec![
            Arc::clone(&self.channels) as Arc<dyn Purgeable>,
            Arc::clone(&self.feeds) as Arc<dyn Purgeable>,
        ]
    }

    async fn build(&self, channel: Channel) -> FeedResult<Bytes> {
        info!("Building feed for {} ({})", channel.id, channel.title);

        let listings = self.lister.list(&channel.id, self.max_results).await?;
        let results = self.enricher.enrich_all(listings).await;

        if !results.is_empty() && results.iter().all(|(_, outcome)| !outcome.is_enriched()) {
            return Err(FeedError::upstream(
                "enricher",
                format!("all {} listed videos failed enrichment", results.len()),
            ));
        }

        let (listings, outcomes) = unzip_outcomes(results);
        let feed = assemble(channel, listings, outcomes);
        self.serializer.serialize(&feed)
    }

    fn stale_or(&self, channel_id: &str, error: FeedError) -> FeedResult<FeedResponse> {
        if !self.serve_stale_on_error || !error.allows_stale_fallback() {
            return Err(error);
        }

        match self.feeds.get_stale(channel_id) {
            Some(body) => {
                let age = self
                    .feeds
                    .age(channel_id)
                    .map(|age| humantime::format_duration(Duration::from_secs(age.as_secs())).to_string())
                    .unwrap_or_default();
                warn!(
                    "Serving stale feed for {} (age {}) after error: {}",
                    channel_id, age, error
                );
                Ok(FeedResponse {
                    channel_id: channel_id.to_string(),
                    body,
                    stale: true,
                })
            }
            None => Err(error),
        }
    }
}
