//! Web handlers module
//!
//! HTTP request handlers organized by domain. Handlers stay thin and delegate
//! to [`crate::services::FeedService`].

pub mod channels;
pub mod feeds;
pub mod health;
