//! Video enricher
//!
//! Resolves playback metadata for every listed video. Each video runs as its
//! own task on a [`JoinSet`]; a [`Semaphore`] bounds how many of them talk to
//! upstream at the same time. Within one video the media probe and the
//! content-details lookup run concurrently.
//!
//! A failing video only affects its own outcome. The batch as a whole is
//! bounded by a deadline, after which unfinished tasks are aborted and
//! reported as timed out.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::{FeedError, FeedResult};
use crate::models::{EnrichmentOutcome, VideoEnrichment, VideoListing};
use crate::sources::{MediaProbe, VideoProvider};
use crate::utils::duration::parse_iso8601_duration;
use crate::utils::url::UrlUtils;

const SERVICE: &str = "enricher";

pub struct VideoEnricher {
    provider: Arc<dyn VideoProvider>,
    probe: Arc<dyn MediaProbe>,
    media_base_url: String,
    concurrency: usize,
    call_timeout: Duration,
    request_timeout: Duration,
}

/// Everything one enrichment task needs, owned so it can move into the task
struct EnrichmentJob {
    provider: Arc<dyn VideoProvider>,
    probe: Arc<dyn MediaProbe>,
    video_id: String,
    media_url: String,
    call_timeout: Duration,
}

impl VideoEnricher {
    pub fn new(
        provider: Arc<dyn VideoProvider>,
        probe: Arc<dyn MediaProbe>,
        media_base_url: impl Into<String>,
        concurrency: usize,
        call_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            probe,
            media_base_url: media_base_url.into(),
            concurrency: concurrency.max(1),
            call_timeout,
            request_timeout,
        }
    }

    /// Enrich `listings`, returning one outcome per listing in input order
    pub async fn enrich_all(
        &self,
        listings: Vec<VideoListing>,
    ) -> Vec<(VideoListing, EnrichmentOutcome)> {
        if listings.is_empty() {
            return Vec::new();
        }

        let started = Instant::now();
        let deadline = started + self.request_timeout;
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (index, listing) in listings.iter().enumerate() {
            let job = EnrichmentJob {
                provider: Arc::clone(&self.provider),
                probe: Arc::clone(&self.probe),
                video_id: listing.video_id.clone(),
                media_url: UrlUtils::media_url(&self.media_base_url, &listing.video_id),
                call_timeout: self.call_timeout,
            };
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => job.run().await,
                    Err(_) => EnrichmentOutcome::failed(
                        job.video_id,
                        FeedError::upstream(SERVICE, "enrichment pool closed"),
                    ),
                };
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<EnrichmentOutcome>> = vec![None; listings.len()];
        let mut timed_out = false;

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((index, outcome)))) => outcomes[index] = Some(outcome),
                Ok(Some(Err(e))) => warn!("Enrichment task did not complete: {}", e),
                Ok(None) => break,
                Err(_) => {
                    timed_out = true;
                    warn!(
                        "Enrichment deadline of {} passed with {} videos outstanding",
                        humantime::format_duration(self.request_timeout),
                        tasks.len()
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }

        let results: Vec<(VideoListing, EnrichmentOutcome)> = listings
            .into_iter()
            .zip(outcomes)
            .map(|(listing, outcome)| {
                let outcome = outcome.unwrap_or_else(|| {
                    let cause = if timed_out {
                        FeedError::timeout(SERVICE, self.request_timeout)
                    } else {
                        FeedError::upstream(SERVICE, "enrichment task aborted")
                    };
                    EnrichmentOutcome::failed(listing.video_id.clone(), cause)
                });
                (listing, outcome)
            })
            .collect();

        for (_, outcome) in &results {
            if let EnrichmentOutcome::Failed(failure) = outcome {
                warn!("Skipping video {}: {}", failure.video_id, failure.cause);
            }
        }

        let enriched = results.iter().filter(|(_, o)| o.is_enriched()).count();
        info!(
            "Enriched {}/{} videos in {}ms",
            enriched,
            results.len(),
            started.elapsed().as_millis()
        );

        results
    }
}

impl EnrichmentJob {
    async fn run(self) -> EnrichmentOutcome {
        let (probed, duration) = tokio::join!(self.probe_media(), self.fetch_duration());

        match (probed, duration) {
            (Ok(details), Ok(duration)) => {
                debug!(
                    "Video {}: {}s, {} bytes of {}",
                    self.video_id,
                    duration.as_secs(),
                    details.content_length,
                    details.content_type
                );
                EnrichmentOutcome::Enriched(VideoEnrichment {
                    video_id: self.video_id,
                    duration,
                    media_url: self.media_url,
                    content_length: details.content_length,
                    content_type: details.content_type,
                })
            }
            (Err(cause), _) | (_, Err(cause)) => EnrichmentOutcome::failed(self.video_id, cause),
        }
    }

    async fn probe_media(&self) -> FeedResult<crate::models::MediaDetails> {
        tokio::time::timeout(self.call_timeout, self.probe.probe(&self.media_url))
            .await
            .map_err(|_| {
                FeedError::probe(
                    &self.media_url,
                    format!("timed out after {}", humantime::format_duration(self.call_timeout)),
                )
            })?
    }

    async fn fetch_duration(&self) -> FeedResult<Duration> {
        let raw = tokio::time::timeout(
            self.call_timeout,
            self.provider.content_duration(&self.video_id),
        )
        .await
        .map_err(|_| FeedError::timeout(self.provider.name(), self.call_timeout))??;

        parse_iso8601_duration(&raw)
    }
}
