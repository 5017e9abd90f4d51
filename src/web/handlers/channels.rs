//! Channel lookup HTTP handler

use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::debug;

use crate::errors::AppError;
use crate::web::{responses::ok, AppState};

#[derive(Debug, Deserialize)]
pub struct ChannelQuery {
    pub q: Option<String>,
}

/// Resolve `?q=` to a channel
pub async fn find_channel(
    State(state): State<AppState>,
    Query(params): Query<ChannelQuery>,
) -> Result<impl IntoResponse, AppError> {
    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(AppError::validation("query parameter 'q' must not be empty"));
    }

    debug!("Channel lookup for '{}'", query);
    let channel = state.feed_service.find_channel(query).await?;
    Ok(ok(channel))
}
