use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use defaults::*;
use duration_serde::duration;

/// Prefix for environment overrides, e.g. `CHANNELCAST__YOUTUBE__API_KEY`
pub const ENV_PREFIX: &str = "CHANNELCAST";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub youtube: YouTubeConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeConfig {
    #[serde(default = "default_youtube_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    /// Timeout applied to every listing and channel lookup call
    #[serde(default = "default_upstream_timeout", with = "duration")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Number of most recent videos placed in a feed
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    /// Base URL of the media-serving component; falls back to `web.base_url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_base_url: Option<String>,
    #[serde(default = "default_generator")]
    pub generator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Maximum number of videos enriched at the same time per feed build
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Timeout for each probe or content-details call
    #[serde(default = "default_call_timeout", with = "duration")]
    pub call_timeout: Duration,
    /// Deadline for the whole enrichment batch of one feed build
    #[serde(default = "default_request_timeout", with = "duration")]
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_channel_ttl", with = "duration")]
    pub channel_ttl: Duration,
    #[serde(default = "default_feed_ttl", with = "duration")]
    pub feed_ttl: Duration,
    /// Serve an expired feed when a rebuild fails upstream
    #[serde(default = "default_serve_stale_on_error")]
    pub serve_stale_on_error: bool,
    /// How long expired entries are retained as a fallback
    #[serde(default = "default_stale_retention", with = "duration")]
    pub stale_retention: Duration,
    #[serde(default = "default_purge_interval", with = "duration")]
    pub purge_interval: Duration,
}

// Web defaults
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

// Upstream defaults
fn default_youtube_api_url() -> String {
    DEFAULT_YOUTUBE_API_URL.to_string()
}

fn default_upstream_timeout() -> Duration {
    Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS)
}

// Feed defaults
fn default_max_results() -> u32 {
    DEFAULT_MAX_RESULTS
}

fn default_generator() -> String {
    DEFAULT_GENERATOR.to_string()
}

// Enrichment defaults
fn default_concurrency() -> usize {
    DEFAULT_ENRICHMENT_CONCURRENCY
}

fn default_call_timeout() -> Duration {
    Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
}

// Cache defaults
fn default_channel_ttl() -> Duration {
    Duration::from_secs(DEFAULT_CHANNEL_TTL_SECS)
}

fn default_feed_ttl() -> Duration {
    Duration::from_secs(DEFAULT_FEED_TTL_SECS)
}

fn default_serve_stale_on_error() -> bool {
    DEFAULT_SERVE_STALE_ON_ERROR
}

fn default_stale_retention() -> Duration {
    Duration::from_secs(DEFAULT_STALE_RETENTION_SECS)
}

fn default_purge_interval() -> Duration {
    Duration::from_secs(DEFAULT_PURGE_INTERVAL_SECS)
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: default_base_url(),
        }
    }
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_url: default_youtube_api_url(),
            api_key: String::new(),
            timeout: default_upstream_timeout(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            media_base_url: None,
            generator: default_generator(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            call_timeout: default_call_timeout(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            channel_ttl: default_channel_ttl(),
            feed_ttl: default_feed_ttl(),
            serve_stale_on_error: default_serve_stale_on_error(),
            stale_retention: default_stale_retention(),
            purge_interval: default_purge_interval(),
        }
    }
}

impl FeedConfig {
    /// Base URL used to build media URLs, without a trailing slash
    pub fn media_base_url<'a>(&'a self, web: &'a WebConfig) -> &'a str {
        self.media_base_url
            .as_deref()
            .unwrap_or(&web.base_url)
            .trim_end_matches('/')
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from_file(&config_file)
    }

    /// Load configuration layered as defaults, then the TOML file (if it
    /// exists), then `CHANNELCAST__*` environment variables.
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        if Path::new(config_file).exists() {
            info!("Loading configuration from: {}", config_file);
        } else {
            info!(
                "Config file {} not found, using defaults and environment",
                config_file
            );
        }

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::with_name(config_file).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let loaded: Self = settings.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.enrichment.concurrency == 0 {
            anyhow::bail!("enrichment.concurrency must be at least 1");
        }
        if self.feed.max_results == 0 || self.feed.max_results > MAX_RESULTS_LIMIT {
            anyhow::bail!(
                "feed.max_results must be between 1 and {}, got {}",
                MAX_RESULTS_LIMIT,
                self.feed.max_results
            );
        }
        url::Url::parse(&self.web.base_url)
            .map_err(|e| anyhow::anyhow!("web.base_url '{}' is invalid: {}", self.web.base_url, e))?;
        if let Some(media_base_url) = &self.feed.media_base_url {
            url::Url::parse(media_base_url).map_err(|e| {
                anyhow::anyhow!("feed.media_base_url '{}' is invalid: {}", media_base_url, e)
            })?;
        }
        url::Url::parse(&self.youtube.api_url).map_err(|e| {
            anyhow::anyhow!("youtube.api_url '{}' is invalid: {}", self.youtube.api_url, e)
        })?;
        Ok(())
    }
}
