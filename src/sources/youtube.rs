//! YouTube Data API v3 provider
//!
//! Every request uses field selection so the provider only returns the
//! snippet fields the feed needs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use super::traits::VideoProvider;
use crate::config::defaults::MAX_RESULTS_LIMIT;
use crate::config::YouTubeConfig;
use crate::errors::{AppError, AppResult, FeedError, FeedResult};
use crate::models::{Channel, VideoListing};
use crate::utils::url::UrlUtils;

const SERVICE: &str = "youtube";

const VIDEO_LIST_FIELDS: &str =
    "items(id,snippet(channelId,channelTitle,description,publishedAt,thumbnails/high,title))";
const CHANNEL_SEARCH_FIELDS: &str =
    "items(id/channelId,snippet(channelId,title,description,thumbnails/high))";
const CHANNEL_FIELDS: &str = "items(id,snippet(title,description,thumbnails/high))";
const DURATION_FIELDS: &str = "items/contentDetails/duration";

/// Error reasons the API uses for quota and throttling failures
const RATE_LIMIT_REASONS: [&str; 3] = ["quotaExceeded", "rateLimitExceeded", "userRateLimitExceeded"];

/// reqwest-backed client for the YouTube Data API
pub struct YouTubeClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl YouTubeClient {
    pub fn new(config: &YouTubeConfig) -> AppResult<Self> {
        if config.api_key.is_empty() {
            warn!("youtube.api_key is empty; upstream calls will be rejected");
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("channelcast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(AppError::Http)?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        subject: &str,
        params: &[(&str, &str)],
    ) -> FeedResult<T> {
        let mut url = UrlUtils::join(&self.api_url, endpoint)
            .map_err(|e| FeedError::upstream(SERVICE, format!("invalid API URL: {e}")))?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().copied())
            .append_pair("key", &self.api_key);

        let log_url = UrlUtils::obfuscate_credentials(url.as_str());
        debug!("GET {}", log_url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FeedError::upstream(SERVICE, format!("request timed out: {log_url}"))
            } else {
                FeedError::upstream(SERVICE, UrlUtils::obfuscate_credentials(&e.to_string()))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_seconds(response.headers());
            let body = response.text().await.unwrap_or_default();
            let error = classify_failure(status, retry_after, &body, subject);
            warn!("{} {} failed: {}", endpoint, status, error);
            return Err(error);
        }

        response.json::<T>().await.map_err(|e| {
            FeedError::upstream(SERVICE, format!("invalid {endpoint} response: {e}"))
        })
    }

    async fn channel_by_id(&self, channel_id: &str) -> FeedResult<Option<Channel>> {
        let response: ChannelsResponse = self
            .get_json(
                "channels",
                channel_id,
                &[("part", "snippet"), ("id", channel_id), ("fields", CHANNEL_FIELDS)],
            )
            .await?;

        Ok(response.items.into_iter().next().map(|item| Channel {
            id: item.id,
            title: item.snippet.title,
            description: item.snippet.description,
            thumbnail_url: item.snippet.thumbnails.best_url(),
            last_resolved_at: Utc::now(),
        }))
    }

    async fn search_channel(&self, query: &str) -> FeedResult<Option<Channel>> {
        let response: SearchResponse = self
            .get_json(
                "search",
                query,
                &[
                    ("part", "snippet"),
                    ("type", "channel"),
                    ("q", query),
                    ("maxResults", "1"),
                    ("fields", CHANNEL_SEARCH_FIELDS),
                ],
            )
            .await?;

        Ok(response.items.into_iter().find_map(|item| {
            let id = item.id.channel_id.or_else(|| {
                (!item.snippet.channel_id.is_empty()).then(|| item.snippet.channel_id.clone())
            })?;
            Some(Channel {
                id,
                title: item.snippet.title,
                description: item.snippet.description,
                thumbnail_url: item.snippet.thumbnails.best_url(),
                last_resolved_at: Utc::now(),
            })
        }))
    }
}

#[async_trait]
impl VideoProvider for YouTubeClient {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn find_channel(&self, query: &str) -> FeedResult<Option<Channel>> {
        if looks_like_channel_id(query) {
            if let Some(channel) = self.channel_by_id(query).await? {
                return Ok(Some(channel));
            }
            debug!("'{}' is not a known channel id, falling back to search", query);
        }
        self.search_channel(query).await
    }

    async fn list_videos(&self, channel_id: &str, limit: u32) -> FeedResult<Vec<VideoListing>> {
        let max_results = limit.min(MAX_RESULTS_LIMIT).to_string();
        let response: SearchResponse = self
            .get_json(
                "search",
                channel_id,
                &[
                    ("part", "snippet"),
                    ("order", "date"),
                    ("type", "video"),
                    ("channelId", channel_id),
                    ("maxResults", &max_results),
                    ("fields", VIDEO_LIST_FIELDS),
                ],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(|item| item.into_listing(channel_id))
            .collect())
    }

    async fn content_duration(&self, video_id: &str) -> FeedResult<String> {
        let response: VideosResponse = self
            .get_json(
                "videos",
                video_id,
                &[
                    ("part", "contentDetails"),
                    ("id", video_id),
                    ("maxResults", "1"),
                    ("fields", DURATION_FIELDS),
                ],
            )
            .await?;

        match response.items.as_slice() {
            [item] => Ok(item.content_details.duration.clone()),
            items => Err(FeedError::upstream(
                SERVICE,
                format!(
                    "expected exactly one content details item for {video_id}, got {}",
                    items.len()
                ),
            )),
        }
    }
}

/// Canonical channel ids are `UC` followed by 22 URL-safe base64 characters
pub fn looks_like_channel_id(query: &str) -> bool {
    query.len() == 24
        && query.starts_with("UC")
        && query
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Map a non-success response for `subject` (query or id) to a pipeline error
pub fn classify_failure(
    status: StatusCode,
    retry_after: Option<u64>,
    body: &str,
    subject: &str,
) -> FeedError {
    if status == StatusCode::NOT_FOUND {
        return FeedError::not_found(subject);
    }

    let reason = serde_json::from_str::<ApiErrorResponse>(body)
        .ok()
        .and_then(|e| e.error.errors.into_iter().next())
        .map(|e| e.reason)
        .unwrap_or_default();

    if status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && RATE_LIMIT_REASONS.contains(&reason.as_str()))
    {
        return FeedError::rate_limited(SERVICE, retry_after);
    }

    let detail = if reason.is_empty() {
        status.to_string()
    } else {
        format!("{status} ({reason})")
    };
    FeedError::upstream(SERVICE, detail)
}

fn retry_after_seconds(headers: &header::HeaderMap) -> Option<u64> {
    headers
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

/// Accept missing or malformed timestamps as `None`; such videos are dropped
/// during assembly instead of failing the whole listing
fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }))
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchId,
    #[serde(default)]
    snippet: Snippet,
}

impl SearchItem {
    fn into_listing(self, requested_channel: &str) -> Option<VideoListing> {
        let video_id = self.id.video_id?;
        let channel_id = if self.snippet.channel_id.is_empty() {
            requested_channel.to_string()
        } else {
            self.snippet.channel_id
        };
        Some(VideoListing {
            video_id,
            title: self.snippet.title,
            description: self.snippet.description,
            published_at: self.snippet.published_at,
            thumbnail_url: self.snippet.thumbnails.best_url(),
            channel_id,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    video_id: Option<String>,
    channel_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Snippet {
    #[serde(deserialize_with = "lenient_datetime")]
    published_at: Option<DateTime<Utc>>,
    channel_id: String,
    title: String,
    description: String,
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

impl Thumbnails {
    fn best_url(&self) -> Option<String> {
        self.high
            .as_ref()
            .or(self.medium.as_ref())
            .or(self.default.as_ref())
            .map(|t| t.url.clone())
    }
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChannelsResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    id: String,
    #[serde(default)]
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoDetailsItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoDetailsItem {
    content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    reason: String,
}
