//! HEAD probe against the media-serving component

use async_trait::async_trait;
use reqwest::{header, Client, Response};
use std::time::Duration;
use tracing::debug;

use super::traits::MediaProbe;
use crate::errors::{AppError, AppResult, FeedError, FeedResult};
use crate::models::MediaDetails;

pub const DEFAULT_MEDIA_TYPE: &str = "audio/mpeg";

pub struct HttpMediaProbe {
    client: Client,
}

impl HttpMediaProbe {
    pub fn new(timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("channelcast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(AppError::Http)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MediaProbe for HttpMediaProbe {
    async fn probe(&self, url: &str) -> FeedResult<MediaDetails> {
        debug!("HEAD {}", url);

        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| FeedError::probe(url, e.to_string()))?;

        if !response.status().is_success() {
            return Err(FeedError::probe(
                url,
                format!("unexpected status {}", response.status()),
            ));
        }

        Ok(media_details(&response))
    }
}

fn media_details(response: &Response) -> MediaDetails {
    let headers = response.headers();

    // reqwest's content_length() reports the (empty) body size for HEAD
    let content_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0);

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string());

    MediaDetails {
        content_type,
        content_length,
    }
}
