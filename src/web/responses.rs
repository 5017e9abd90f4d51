//! HTTP response types and utilities
//!
//! Standardized JSON envelope for API responses and the mapping from
//! application errors to HTTP status codes.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::cache::CacheStats;
use crate::errors::{AppError, FeedError};

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the operation was successful
    pub success: bool,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Request timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    /// Create a successful response
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Create an error response
    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Health endpoint payload
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub caches: Vec<CacheStats>,
}

impl HealthResponse {
    pub fn healthy(caches: Vec<CacheStats>) -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            caches,
        }
    }
}

/// Success response helpers
pub fn ok<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

pub fn no_content() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

pub fn not_found(resource: &str, id: &str) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error(format!(
            "{} with id '{}' not found",
            resource, id
        ))),
    )
}

/// Status code for a feed pipeline error
pub fn feed_error_status(error: &FeedError) -> StatusCode {
    match error {
        FeedError::NotFound { .. } => StatusCode::NOT_FOUND,
        FeedError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        FeedError::Upstream { .. } | FeedError::Probe { .. } => StatusCode::BAD_GATEWAY,
        FeedError::Parse { .. } | FeedError::Serialization { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Convert AppError to appropriate HTTP response
pub fn handle_error(error: AppError) -> Response {
    let (status, message, retry_after) = match &error {
        AppError::Feed(feed_error) => {
            let retry_after = match feed_error {
                FeedError::RateLimited { retry_after, .. } => *retry_after,
                _ => None,
            };
            (feed_error_status(feed_error), feed_error.to_string(), retry_after)
        }
        AppError::Validation { message } => (StatusCode::BAD_REQUEST, message.clone(), None),
        AppError::Internal { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal error: {}", message),
            None,
        ),
        AppError::Http(_) => (
            StatusCode::BAD_GATEWAY,
            "External service communication failed".to_string(),
            None,
        ),
    };

    if status.is_server_error() {
        error!("Request failed with {}: {}", status, error);
    }

    let mut response = (status, Json(ApiResponse::<()>::error(message))).into_response();
    if let Some(seconds) = retry_after {
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
    }
    response
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        handle_error(self)
    }
}
