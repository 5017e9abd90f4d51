//! Feed document HTTP handlers

use axum::{
    extract::{Path, State},
    http::{header, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::errors::AppError;
use crate::feed::RSS_CONTENT_TYPE;
use crate::web::{
    responses::{no_content, not_found},
    AppState,
};

pub const FEED_STALE_HEADER: HeaderName = HeaderName::from_static("x-feed-stale");

/// Serve the RSS document for a channel query or id
pub async fn get_feed(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> Result<Response, AppError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::validation("channel query must not be empty"));
    }

    let feed = state.feed_service.feed(query).await?;
    debug!(
        "Serving feed for {} ({} bytes, stale={})",
        feed.channel_id,
        feed.body.len(),
        feed.stale
    );

    let max_age = if feed.stale {
        0
    } else {
        state.config.cache.feed_ttl.as_secs()
    };

    let mut response = (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(RSS_CONTENT_TYPE)),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_str(&format!("public, max-age={max_age}"))
                    .map_err(|e| AppError::internal(e.to_string()))?,
            ),
        ],
        feed.body,
    )
        .into_response();

    if feed.stale {
        response
            .headers_mut()
            .insert(FEED_STALE_HEADER, HeaderValue::from_static("true"));
    }

    Ok(response)
}

/// Drop the cached document of a channel
pub async fn invalidate_feed(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Response {
    if state.feed_service.invalidate(channel_id.trim()) {
        no_content().into_response()
    } else {
        not_found("Feed", &channel_id).into_response()
    }
}
