//! Health check HTTP handler

use axum::{extract::State, response::IntoResponse};

use crate::web::{
    responses::{ok, HealthResponse},
    AppState,
};

/// Application status plus counters of both caches
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    ok(HealthResponse::healthy(state.feed_service.stats()))
}
