mod common;

use bytes::Bytes;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::sync::Arc;
use std::time::Duration;

use channelcast::errors::FeedError;
use channelcast::models::EnrichmentOutcome;
use channelcast::services::VideoEnricher;
use common::*;

/// Text of every element named `name`, in document order
fn element_texts(body: &Bytes, name: &str) -> Vec<String> {
    let xml = std::str::from_utf8(body).unwrap();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut inside = false;
    let mut texts = Vec::new();
    loop {
        match reader.read_event().unwrap() {
            Event::Start(e) => inside = e.name().as_ref() == name.as_bytes(),
            Event::Text(t) if inside => texts.push(t.unescape().unwrap().into_owned()),
            Event::End(_) => inside = false,
            Event::Eof => break,
            _ => {}
        }
    }
    texts
}

#[tokio::test]
async fn test_failed_video_is_dropped_and_order_is_by_recency() {
    let provider = Arc::new(FakeProvider::new(vec![
        listing("V1", 3),
        listing("V2", 5),
        listing("V3", 1),
    ]));
    let probe = Arc::new(FakeProbe::failing(&["V2"]));
    let service = service(&test_config(), provider, probe);

    let feed = service.feed(CHANNEL_QUERY).await.unwrap();

    assert!(!feed.stale);
    assert_eq!(feed.channel_id, CHANNEL_ID);
    assert_eq!(element_texts(&feed.body, "guid"), vec!["V1", "V3"]);
    assert_eq!(
        element_texts(&feed.body, "lastBuildDate"),
        vec!["Wed, 03 Jan 2024 12:00:00 +0000"]
    );

    // The first link is the channel page
    let links = element_texts(&feed.body, "link");
    assert_eq!(
        &links[1..],
        &[
            "http://media.test/video/V1/track.mp3".to_string(),
            "http://media.test/video/V3/track.mp3".to_string()
        ]
    );
    assert_eq!(element_texts(&feed.body, "itunes:duration"), vec!["3730", "3730"]);
}

#[tokio::test]
async fn test_malformed_duration_drops_only_that_video() {
    let provider = Arc::new(
        FakeProvider::new(vec![listing("A", 2), listing("B", 4)]).with_duration("B", "XYZ"),
    );
    let service = service(&test_config(), provider, Arc::new(FakeProbe::default()));

    let feed = service.feed(CHANNEL_ID).await.unwrap();

    assert_eq!(element_texts(&feed.body, "guid"), vec!["A"]);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_requests_share_one_build() {
    let provider = Arc::new(
        FakeProvider::new(vec![listing("A", 2), listing("B", 4)])
            .with_list_delay(Duration::from_millis(200)),
    );
    let service = service(&test_config(), provider.clone(), Arc::new(FakeProbe::default()));

    let (first, second) = tokio::join!(service.feed(CHANNEL_QUERY), service.feed(CHANNEL_QUERY));
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.body, second.body);
    assert_eq!(provider.list_calls(), 1);
    assert_eq!(provider.find_calls(), 1);

    let stats = service.stats();
    let feeds = stats.iter().find(|s| s.name == "feeds").unwrap();
    assert_eq!(feeds.populations, 1);
    assert_eq!(feeds.coalesced, 1);
}

#[tokio::test]
async fn test_concurrent_requests_share_a_failed_build() {
    let provider = Arc::new(
        FakeProvider::new(vec![listing("A", 2)]).with_list_delay(Duration::from_millis(200)),
    );
    provider.fail_listing(FeedError::rate_limited("fake", Some(60)));
    let service = service(&test_config(), provider.clone(), Arc::new(FakeProbe::default()));

    let results = tokio::join!(
        service.feed(CHANNEL_ID),
        service.feed(CHANNEL_ID),
        service.feed(CHANNEL_ID),
        service.feed(CHANNEL_ID),
        service.feed(CHANNEL_ID),
    );
    for result in [results.0, results.1, results.2, results.3, results.4] {
        assert_eq!(result.unwrap_err(), FeedError::rate_limited("fake", Some(60)));
    }
    assert_eq!(provider.list_calls(), 1);

    // Nothing was stored, so a later request reaches the provider again
    service.feed(CHANNEL_ID).await.unwrap_err();
    assert_eq!(provider.list_calls(), 2);
}

#[tokio::test]
async fn test_cached_feed_is_served_without_upstream_calls() {
    let provider = Arc::new(FakeProvider::new(vec![listing("A", 2)]));
    let service = service(&test_config(), provider.clone(), Arc::new(FakeProbe::default()));

    let first = service.feed(CHANNEL_ID).await.unwrap();
    let second = service.feed(CHANNEL_ID).await.unwrap();

    assert_eq!(first.body, second.body);
    assert_eq!(provider.list_calls(), 1);
    assert_eq!(provider.duration_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_invalidate_forces_rebuild() {
    let provider = Arc::new(FakeProvider::new(vec![listing("A", 2)]));
    let service = service(&test_config(), provider.clone(), Arc::new(FakeProbe::default()));

    service.feed(CHANNEL_ID).await.unwrap();
    assert!(service.invalidate(CHANNEL_ID));
    assert!(!service.invalidate(CHANNEL_ID));
    service.feed(CHANNEL_ID).await.unwrap();

    assert_eq!(provider.list_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stale_feed_served_when_listing_fails() {
    let provider = Arc::new(FakeProvider::new(vec![listing("A", 2)]));
    let config = test_config();
    let service = service(&config, provider.clone(), Arc::new(FakeProbe::default()));

    let fresh = service.feed(CHANNEL_ID).await.unwrap();

    tokio::time::advance(config.cache.feed_ttl + Duration::from_secs(1)).await;
    provider.fail_listing(FeedError::upstream("fake", "503 Service Unavailable"));

    let stale = service.feed(CHANNEL_ID).await.unwrap();
    assert!(stale.stale);
    assert_eq!(stale.body, fresh.body);
    assert_eq!(provider.list_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stale_fallback_can_be_disabled() {
    let provider = Arc::new(FakeProvider::new(vec![listing("A", 2)]));
    let mut config = test_config();
    config.cache.serve_stale_on_error = false;
    let service = service(&config, provider.clone(), Arc::new(FakeProbe::default()));

    service.feed(CHANNEL_ID).await.unwrap();

    tokio::time::advance(config.cache.feed_ttl + Duration::from_secs(1)).await;
    provider.fail_listing(FeedError::rate_limited("fake", Some(30)));

    let err = service.feed(CHANNEL_ID).await.unwrap_err();
    assert_eq!(err, FeedError::rate_limited("fake", Some(30)));
}

#[tokio::test]
async fn test_listing_failure_without_cached_feed_is_reported() {
    let provider = Arc::new(FakeProvider::new(vec![listing("A", 2)]));
    provider.fail_listing(FeedError::upstream("fake", "503 Service Unavailable"));
    let service = service(&test_config(), provider, Arc::new(FakeProbe::default()));

    let err = service.feed(CHANNEL_ID).await.unwrap_err();
    assert!(matches!(err, FeedError::Upstream { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_all_enrichments_failing_falls_back_to_stale() {
    let provider = Arc::new(FakeProvider::new(vec![listing("A", 2), listing("B", 3)]));
    let probe = Arc::new(FakeProbe::default());
    let config = test_config();
    let service = service(&config, provider.clone(), probe.clone());

    let fresh = service.feed(CHANNEL_ID).await.unwrap();
    assert_eq!(element_texts(&fresh.body, "guid"), vec!["B", "A"]);

    tokio::time::advance(config.cache.feed_ttl + Duration::from_secs(1)).await;
    probe.fail(&["A", "B"]);

    let stale = service.feed(CHANNEL_ID).await.unwrap();
    assert!(stale.stale);
    assert_eq!(stale.body, fresh.body);
}

#[tokio::test]
async fn test_all_enrichments_failing_without_cached_feed_is_upstream_error() {
    let provider = Arc::new(FakeProvider::new(vec![listing("A", 2), listing("B", 3)]));
    let service = service(
        &test_config(),
        provider,
        Arc::new(FakeProbe::failing(&["A", "B"])),
    );

    let err = service.feed(CHANNEL_ID).await.unwrap_err();
    assert!(matches!(err, FeedError::Upstream { .. }), "unexpected: {err:?}");
}

#[tokio::test]
async fn test_unknown_channel_is_not_found() {
    let provider = Arc::new(FakeProvider::new(vec![listing("A", 2)]));
    let service = service(&test_config(), provider.clone(), Arc::new(FakeProbe::default()));

    let err = service.feed("no such channel").await.unwrap_err();
    assert_eq!(err, FeedError::not_found("no such channel"));
    assert_eq!(provider.list_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_not_found_is_never_masked_by_retained_feed() {
    let provider = Arc::new(FakeProvider::new(vec![listing("A", 2)]));
    let config = test_config();
    let service = service(&config, provider.clone(), Arc::new(FakeProbe::default()));

    service.feed(CHANNEL_ID).await.unwrap();

    tokio::time::advance(config.cache.channel_ttl + Duration::from_secs(1)).await;
    provider.fail_lookup(FeedError::not_found(CHANNEL_ID));

    let err = service.feed(CHANNEL_ID).await.unwrap_err();
    assert_eq!(err, FeedError::not_found(CHANNEL_ID));
    assert_eq!(provider.list_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_expired_channel_is_used_when_lookup_fails() {
    let provider = Arc::new(FakeProvider::new(vec![listing("A", 2)]));
    let config = test_config();
    let service = service(&config, provider.clone(), Arc::new(FakeProbe::default()));

    service.find_channel(CHANNEL_QUERY).await.unwrap();
    tokio::time::advance(config.cache.channel_ttl + Duration::from_secs(1)).await;
    provider.fail_lookup(FeedError::upstream("fake", "500 Internal Server Error"));

    let channel = service.find_channel(CHANNEL_QUERY).await.unwrap();
    assert_eq!(channel.id, CHANNEL_ID);
    assert_eq!(provider.find_calls(), 2);

    let feed = service.feed(CHANNEL_QUERY).await.unwrap();
    assert!(!feed.stale);
}

#[tokio::test(start_paused = true)]
async fn test_enrichment_concurrency_is_bounded() {
    let ids = ["A", "B", "C", "D", "E", "F"];
    let mut provider = FakeProvider::new(
        ids.iter()
            .enumerate()
            .map(|(i, id)| listing(id, i as u32 + 1))
            .collect(),
    );
    for id in ids {
        provider = provider.with_duration_delay(id, Duration::from_millis(100));
    }
    let provider = Arc::new(provider);

    let enricher = VideoEnricher::new(
        provider.clone(),
        Arc::new(FakeProbe::default()),
        "http://media.test",
        2,
        Duration::from_secs(5),
        Duration::from_secs(30),
    );
    let listings = ids
        .iter()
        .enumerate()
        .map(|(i, id)| listing(id, i as u32 + 1))
        .collect();

    let results = enricher.enrich_all(listings).await;

    assert_eq!(results.len(), 6);
    assert!(results.iter().all(|(_, outcome)| outcome.is_enriched()));
    assert!(provider.gauge.peak() <= 2, "peak was {}", provider.gauge.peak());
    assert!(provider.gauge.peak() >= 1);
}

#[tokio::test(start_paused = true)]
async fn test_results_keep_input_order() {
    let provider = Arc::new(
        FakeProvider::new(vec![listing("slow", 1), listing("fast", 2)])
            .with_duration_delay("slow", Duration::from_secs(2)),
    );
    let enricher = VideoEnricher::new(
        provider,
        Arc::new(FakeProbe::default()),
        "http://media.test",
        4,
        Duration::from_secs(5),
        Duration::from_secs(30),
    );

    let results = enricher
        .enrich_all(vec![listing("slow", 1), listing("fast", 2)])
        .await;

    let ids: Vec<&str> = results.iter().map(|(l, _)| l.video_id.as_str()).collect();
    assert_eq!(ids, vec!["slow", "fast"]);
    assert_eq!(results[0].1.video_id(), "slow");
    assert_eq!(
        results[0].1.enrichment().unwrap().duration,
        Duration::from_secs(3730)
    );
}

#[tokio::test(start_paused = true)]
async fn test_call_timeout_fails_single_video() {
    let provider = Arc::new(
        FakeProvider::new(vec![listing("A", 1), listing("B", 2)])
            .with_duration_delay("B", Duration::from_secs(10)),
    );
    let enricher = VideoEnricher::new(
        provider,
        Arc::new(FakeProbe::default()),
        "http://media.test",
        4,
        Duration::from_secs(1),
        Duration::from_secs(30),
    );

    let results = enricher
        .enrich_all(vec![listing("A", 1), listing("B", 2)])
        .await;

    assert!(results[0].1.is_enriched());
    match &results[1].1 {
        EnrichmentOutcome::Failed(failure) => {
            assert_eq!(failure.video_id, "B");
            assert_eq!(failure.cause, FeedError::timeout("fake", Duration::from_secs(1)));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_request_deadline_reports_unfinished_videos() {
    let provider = Arc::new(
        FakeProvider::new(vec![listing("A", 1), listing("B", 2), listing("C", 3)])
            .with_duration_delay("C", Duration::from_secs(120)),
    );
    let enricher = VideoEnricher::new(
        provider,
        Arc::new(FakeProbe::default()),
        "http://media.test",
        4,
        Duration::from_secs(300),
        Duration::from_secs(10),
    );

    let started = tokio::time::Instant::now();
    let results = enricher
        .enrich_all(vec![listing("A", 1), listing("B", 2), listing("C", 3)])
        .await;

    assert!(started.elapsed() < Duration::from_secs(11));
    assert!(results[0].1.is_enriched());
    assert!(results[1].1.is_enriched());
    match &results[2].1 {
        EnrichmentOutcome::Failed(failure) => {
            assert_eq!(
                failure.cause,
                FeedError::timeout("enricher", Duration::from_secs(10))
            );
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}
