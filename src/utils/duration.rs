//! Parsing of the provider's content duration strings
//!
//! Durations arrive ISO-8601 encoded, e.g. `PT1H2M10S`. Videos longer than a
//! day carry a day component (`P1DT2H`) and live streams report `P0D`.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

use crate::errors::{FeedError, FeedResult};

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$")
        .expect("duration pattern must compile")
});

/// Parse a `P[nD][T[nH][nM][nS]]` duration string
pub fn parse_iso8601_duration(input: &str) -> FeedResult<Duration> {
    let trimmed = input.trim();

    let caps = DURATION_RE.captures(trimmed).ok_or_else(|| {
        FeedError::parse(
            input,
            "expected ISO-8601 duration like 'PT1H2M10S'",
        )
    })?;

    // "P" and "PT" match the pattern but carry no component
    if (1..=4).all(|i| caps.get(i).is_none()) {
        return Err(FeedError::parse(input, "duration has no components"));
    }

    let component = |index: usize, unit_seconds: u64| -> FeedResult<u64> {
        match caps.get(index) {
            Some(m) => m
                .as_str()
                .parse::<u64>()
                .ok()
                .and_then(|value| value.checked_mul(unit_seconds))
                .ok_or_else(|| FeedError::parse(input, "duration component out of range")),
            None => Ok(0),
        }
    };

    let total = [
        component(1, 86_400)?,
        component(2, 3_600)?,
        component(3, 60)?,
        component(4, 1)?,
    ]
    .into_iter()
    .try_fold(0u64, u64::checked_add)
    .ok_or_else(|| FeedError::parse(input, "duration out of range"))?;

    Ok(Duration::from_secs(total))
}
