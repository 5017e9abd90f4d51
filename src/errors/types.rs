//! Error type definitions for channelcast
//!
//! This module defines the error hierarchy used throughout the feed pipeline
//! and the web layer.

use std::time::Duration;
use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Feed pipeline errors
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Feed pipeline errors
///
/// Each variant corresponds to one failure class of the pipeline. `Parse` and
/// `Probe` only ever occur per video and end up inside an enrichment failure;
/// the remaining variants can also fail a whole request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The channel query matched nothing
    #[error("Channel not found: {query}")]
    NotFound { query: String },

    /// The upstream provider failed or returned an unusable response
    #[error("Upstream error: {service} - {message}")]
    Upstream { service: String, message: String },

    /// The upstream provider is throttling us
    #[error("Rate limited by {service}{}", retry_suffix(.retry_after))]
    RateLimited {
        service: String,
        retry_after: Option<u64>,
    },

    /// A duration string could not be parsed
    #[error("Parse error: '{input}' - {message}")]
    Parse { input: String, message: String },

    /// The media metadata probe failed
    #[error("Probe failed for {url}: {message}")]
    Probe { url: String, message: String },

    /// The feed document could not be written
    #[error("Serialization failed: {message}")]
    Serialization { message: String },
}

impl FeedError {
    /// Create a not found error for a channel query
    pub fn not_found<Q: Into<String>>(query: Q) -> Self {
        Self::NotFound {
            query: query.into(),
        }
    }

    /// Create an upstream error
    pub fn upstream<S: Into<String>, M: Into<String>>(service: S, message: M) -> Self {
        Self::Upstream {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create an upstream error for an operation that ran out of time
    pub fn timeout<S: Into<String>>(service: S, after: Duration) -> Self {
        Self::Upstream {
            service: service.into(),
            message: format!("timed out after {}", humantime::format_duration(after)),
        }
    }

    /// Create a rate limited error
    pub fn rate_limited<S: Into<String>>(service: S, retry_after: Option<u64>) -> Self {
        Self::RateLimited {
            service: service.into(),
            retry_after,
        }
    }

    /// Create a parse error
    pub fn parse<I: Into<String>, M: Into<String>>(input: I, message: M) -> Self {
        Self::Parse {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Create a probe error
    pub fn probe<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Probe {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization<M: Into<String>>(message: M) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Whether a previously cached feed may be served instead of this error
    pub fn allows_stale_fallback(&self) -> bool {
        matches!(self, Self::Upstream { .. } | Self::RateLimited { .. })
    }
}

fn retry_suffix(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(seconds) => format!(" - retry after {seconds} seconds"),
        None => String::new(),
    }
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
