//! channelcast: turns a video channel into a podcast RSS feed
//!
//! A request names a channel (free-text query or canonical id). The channel
//! is resolved, its most recent videos are listed and enriched with playback
//! metadata, and the result is assembled into an RSS document that is cached
//! per channel.

pub mod cache;
pub mod config;
pub mod errors;
pub mod feed;
pub mod models;
pub mod services;
pub mod sources;
pub mod utils;
pub mod web;
