//! Centralized error handling for channelcast
//!
//! Errors are split in two layers:
//!
//! - **FeedError**: failures of the feed pipeline itself (channel lookup,
//!   listing, enrichment, serialization). Per-video failures are carried as
//!   values inside enrichment outcomes rather than propagated.
//! - **AppError**: the top-level error surfaced to callers of the library and
//!   to the web layer, wrapping `FeedError` alongside validation and
//!   configuration problems.
//!
//! # Usage
//!
//! ```rust
//! use channelcast::errors::{FeedError, FeedResult};
//!
//! fn lookup(query: &str) -> FeedResult<()> {
//!     Err(FeedError::not_found(query))
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for feed pipeline Results
pub type FeedResult<T> = Result<T, FeedError>;
