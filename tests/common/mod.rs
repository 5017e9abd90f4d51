//! In-memory collaborators for pipeline and route tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use channelcast::config::Config;
use channelcast::errors::{FeedError, FeedResult};
use channelcast::models::{Channel, MediaDetails, VideoListing};
use channelcast::services::FeedService;
use channelcast::sources::{MediaProbe, VideoProvider};

pub const CHANNEL_ID: &str = "UCabcdefghijklmnopqrstuv";
pub const CHANNEL_QUERY: &str = "rustconf";

pub fn date(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap()
}

pub fn channel() -> Channel {
    Channel {
        id: CHANNEL_ID.to_string(),
        title: "RustConf".to_string(),
        description: "Talks about Rust".to_string(),
        thumbnail_url: Some("https://yt3.ggpht.com/rustconf.jpg".to_string()),
        last_resolved_at: Utc::now(),
    }
}

pub fn listing(id: &str, day: u32) -> VideoListing {
    VideoListing {
        video_id: id.to_string(),
        title: format!("Talk {id}"),
        description: format!("Description of {id}"),
        published_at: Some(date(day)),
        thumbnail_url: None,
        channel_id: CHANNEL_ID.to_string(),
    }
}

/// Tracks how many calls run at the same time
#[derive(Default)]
pub struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

pub struct FakeProvider {
    pub channels: HashMap<String, Channel>,
    pub listings: Mutex<FeedResult<Vec<VideoListing>>>,
    pub durations: HashMap<String, String>,
    pub find_error: Mutex<Option<FeedError>>,
    pub list_delay: Duration,
    pub duration_delays: HashMap<String, Duration>,
    pub find_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub duration_calls: AtomicUsize,
    pub gauge: Gauge,
}

impl FakeProvider {
    /// A provider that knows one channel under its id and `CHANNEL_QUERY`
    pub fn new(listings: Vec<VideoListing>) -> Self {
        let durations = listings
            .iter()
            .map(|l| (l.video_id.clone(), "PT1H2M10S".to_string()))
            .collect();
        let mut channels = HashMap::new();
        channels.insert(CHANNEL_ID.to_string(), channel());
        channels.insert(CHANNEL_QUERY.to_string(), channel());

        Self {
            channels,
            listings: Mutex::new(Ok(listings)),
            durations,
            find_error: Mutex::new(None),
            list_delay: Duration::ZERO,
            duration_delays: HashMap::new(),
            find_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            duration_calls: AtomicUsize::new(0),
            gauge: Gauge::default(),
        }
    }

    pub fn with_duration(mut self, video_id: &str, raw: &str) -> Self {
        self.durations.insert(video_id.to_string(), raw.to_string());
        self
    }

    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = delay;
        self
    }

    pub fn with_duration_delay(mut self, video_id: &str, delay: Duration) -> Self {
        self.duration_delays.insert(video_id.to_string(), delay);
        self
    }

    pub fn fail_listing(&self, error: FeedError) {
        *self.listings.lock().unwrap() = Err(error);
    }

    pub fn fail_lookup(&self, error: FeedError) {
        *self.find_error.lock().unwrap() = Some(error);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn find_channel(&self, query: &str) -> FeedResult<Option<Channel>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.find_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.channels.get(query).cloned())
    }

    async fn list_videos(&self, _channel_id: &str, limit: u32) -> FeedResult<Vec<VideoListing>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if !self.list_delay.is_zero() {
            tokio::time::sleep(self.list_delay).await;
        }
        let listings = self.listings.lock().unwrap().clone()?;
        Ok(listings.into_iter().take(limit as usize).collect())
    }

    async fn content_duration(&self, video_id: &str) -> FeedResult<String> {
        self.duration_calls.fetch_add(1, Ordering::SeqCst);
        self.gauge.enter();
        if let Some(delay) = self.duration_delays.get(video_id) {
            tokio::time::sleep(*delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        self.gauge.exit();

        self.durations
            .get(video_id)
            .cloned()
            .ok_or_else(|| FeedError::upstream("fake", format!("no content details for {video_id}")))
    }
}

#[derive(Default)]
pub struct FakeProbe {
    pub failing: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
}

impl FakeProbe {
    pub fn failing(ids: &[&str]) -> Self {
        let probe = Self::default();
        probe.fail(ids);
        probe
    }

    /// Make probes for `ids` fail from now on
    pub fn fail(&self, ids: &[&str]) {
        *self.failing.lock().unwrap() = ids.iter().map(|s| s.to_string()).collect();
    }
}

#[async_trait]
impl MediaProbe for FakeProbe {
    async fn probe(&self, url: &str) -> FeedResult<MediaDetails> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|id| url.contains(&format!("/video/{id}/")));
        if failing {
            return Err(FeedError::probe(url, "connection refused"));
        }
        Ok(MediaDetails {
            content_type: "audio/mpeg".to_string(),
            content_length: 1234,
        })
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.web.base_url = "http://media.test".to_string();
    config.enrichment.concurrency = 2;
    config.enrichment.call_timeout = Duration::from_secs(5);
    config.enrichment.request_timeout = Duration::from_secs(10);
    config.cache.feed_ttl = Duration::from_secs(60);
    config.cache.channel_ttl = Duration::from_secs(300);
    config
}

pub fn service(
    config: &Config,
    provider: Arc<FakeProvider>,
    probe: Arc<FakeProbe>,
) -> FeedService {
    FeedService::new(config, provider, probe)
}
