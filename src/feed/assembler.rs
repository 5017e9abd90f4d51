//! Joins listings with their enrichment outcomes into a [`Feed`]

use std::collections::HashMap;
use tracing::debug;

use crate::models::{sort_by_recency, Channel, EnrichmentOutcome, Feed, FeedItem, VideoListing};

/// Build a feed from listings and enrichment outcomes.
///
/// Outcomes are matched to listings by video id, so their order does not
/// matter. Listings whose enrichment failed or is missing, and listings
/// without a publish time, are left out. Items are ordered newest first with
/// listing order breaking ties.
pub fn assemble(
    channel: Channel,
    listings: Vec<VideoListing>,
    outcomes: Vec<EnrichmentOutcome>,
) -> Feed {
    let mut enrichments: HashMap<String, _> = outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            EnrichmentOutcome::Enriched(enrichment) => {
                Some((enrichment.video_id.clone(), enrichment))
            }
            EnrichmentOutcome::Failed(_) => None,
        })
        .collect();

    let listed = listings.len();
    let mut items: Vec<FeedItem> = listings
        .into_iter()
        .enumerate()
        .filter_map(|(order, listing)| {
            let enrichment = enrichments.remove(&listing.video_id)?;
            let Some(published_at) = listing.published_at else {
                debug!("Dropping {}: no publish time", listing.video_id);
                return None;
            };
            Some(FeedItem {
                video_id: listing.video_id,
                title: listing.title,
                description: listing.description,
                published_at,
                thumbnail_url: listing.thumbnail_url,
                media_url: enrichment.media_url,
                content_length: enrichment.content_length,
                content_type: enrichment.content_type,
                duration: enrichment.duration,
                order,
            })
        })
        .collect();

    sort_by_recency(&mut items);
    let last_build_date = items.first().map(|item| item.published_at);

    debug!(
        "Assembled feed for {}: {} of {} listed videos",
        channel.id,
        items.len(),
        listed
    );

    Feed {
        channel,
        items,
        last_build_date,
    }
}

/// Split `enrich_all` results into the two inputs of [`assemble`]
pub fn unzip_outcomes(
    results: Vec<(VideoListing, EnrichmentOutcome)>,
) -> (Vec<VideoListing>, Vec<EnrichmentOutcome>) {
    results.into_iter().unzip()
}
