//! Utility functions for channelcast
//!
//! - `utils::duration` for the provider's ISO-8601 duration strings
//! - `utils::url` for media URL construction and log-safe URLs

use chrono::{DateTime, Utc};

pub mod duration;
pub mod url;

/// Format a timestamp as RFC-1123 with a numeric zone, as used by RSS
/// `pubDate` and `lastBuildDate` (e.g. `Wed, 03 Jan 2024 10:00:00 +0000`)
pub fn format_rfc1123z(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S %z").to_string()
}

/// Truncate `text` to at most `max_chars` characters on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
