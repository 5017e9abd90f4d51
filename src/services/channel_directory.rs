//! Channel directory
//!
//! Resolves free-text queries and canonical ids to [`Channel`]s and keeps the
//! result in the channel cache. Every call for a query that is not cached
//! reaches the provider exactly once, no matter how many requests ask for it
//! at the same time.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::FeedCache;
use crate::errors::{FeedError, FeedResult};
use crate::models::Channel;
use crate::sources::VideoProvider;

pub struct ChannelDirectory {
    provider: Arc<dyn VideoProvider>,
    cache: Arc<FeedCache<Channel>>,
    ttl: Duration,
    upstream_timeout: Duration,
}

impl ChannelDirectory {
    pub fn new(
        provider: Arc<dyn VideoProvider>,
        cache: Arc<FeedCache<Channel>>,
        ttl: Duration,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            cache,
            ttl,
            upstream_timeout,
        }
    }

    /// Resolve `query` to a channel.
    ///
    /// A channel resolved earlier is returned even after its TTL when the
    /// provider is currently failing or throttling.
    pub async fn resolve(&self, query: &str) -> FeedResult<Channel> {
        let key = normalize_query(query)?;

        let result = self
            .cache
            .get_or_try_populate(&key, self.ttl, || self.lookup(&key))
            .await;

        match result {
            Ok(channel) => Ok(channel),
            Err(error) if error.allows_stale_fallback() => match self.cache.get_stale(&key) {
                Some(channel) => {
                    warn!(
                        "Channel lookup for '{}' failed ({}), using expired entry for {}",
                        key, error, channel.id
                    );
                    Ok(channel)
                }
                None => Err(error),
            },
            Err(error) => Err(error),
        }
    }

    async fn lookup(&self, query: &str) -> FeedResult<Channel> {
        debug!("Resolving channel '{}' via {}", query, self.provider.name());

        let found = tokio::time::timeout(self.upstream_timeout, self.provider.find_channel(query))
            .await
            .map_err(|_| FeedError::timeout(self.provider.name(), self.upstream_timeout))??;

        match found {
            Some(channel) => {
                info!("Resolved '{}' to channel {} ({})", query, channel.id, channel.title);
                Ok(channel)
            }
            None => Err(FeedError::not_found(query)),
        }
    }
}

fn normalize_query(query: &str) -> FeedResult<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(FeedError::not_found(query));
    }
    Ok(trimmed.to_string())
}
