/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

// Upstream provider defaults
pub const DEFAULT_YOUTUBE_API_URL: &str = "https://www.googleapis.com/youtube/v3/";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

// Feed defaults
pub const DEFAULT_MAX_RESULTS: u32 = 10;
/// Upper bound accepted by the upstream search endpoint for `maxResults`
pub const MAX_RESULTS_LIMIT: u32 = 50;
pub const DEFAULT_GENERATOR: &str = "channelcast";

// Enrichment defaults
pub const DEFAULT_ENRICHMENT_CONCURRENCY: usize = 4;
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// Cache defaults
pub const DEFAULT_CHANNEL_TTL_SECS: u64 = 60 * 60;
pub const DEFAULT_FEED_TTL_SECS: u64 = 15 * 60;
pub const DEFAULT_SERVE_STALE_ON_ERROR: bool = true;
pub const DEFAULT_STALE_RETENTION_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_PURGE_INTERVAL_SECS: u64 = 10 * 60;
