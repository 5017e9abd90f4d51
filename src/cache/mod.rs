//! In-memory TTL cache with single-flight population
//!
//! [`FeedCache`] backs both the channel directory and the assembled feeds.
//! Entries live in a sharded [`DashMap`], so unrelated keys never contend on a
//! global lock. Population goes through a per-key in-flight slot: the first
//! caller for a missing key builds the value while concurrent callers for the
//! same key join that attempt and receive its outcome, error included. The
//! slot is cleared once the attempt settles.
//!
//! Expired entries are not removed on read. They count as a miss but stay
//! available through [`FeedCache::get_stale`] until they are overwritten,
//! invalidated, or purged by the housekeeper.

use dashmap::DashMap;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::errors::FeedError;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    populations: AtomicU64,
    coalesced: AtomicU64,
    stale_reads: AtomicU64,
}

/// Point-in-time counters of one cache, reported by the health endpoint
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub name: &'static str,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub populations: u64,
    pub coalesced: u64,
    pub stale_reads: u64,
}

/// One population attempt, shared by every caller that joins it
type Flight<V, E> = Arc<OnceCell<Result<V, E>>>;

/// Keyed TTL cache shared across concurrent requests
pub struct FeedCache<V, E = FeedError> {
    name: &'static str,
    entries: DashMap<String, CacheEntry<V>>,
    in_flight: DashMap<String, Flight<V, E>>,
    counters: CacheCounters,
}

impl<V: Clone, E: Clone> FeedCache<V, E> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: DashMap::new(),
            in_flight: DashMap::new(),
            counters: CacheCounters::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Return the value for `key` if present and not expired
    pub fn get(&self, key: &str) -> Option<V> {
        match self.fresh(key) {
            Some(value) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Return the value for `key` regardless of expiry
    pub fn get_stale(&self, key: &str) -> Option<V> {
        let value = self.entries.get(key).map(|entry| entry.value.clone());
        if value.is_some() {
            self.counters.stale_reads.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    /// Store `value` under `key`, replacing any previous entry
    pub fn put(&self, key: &str, value: V, ttl: Duration) {
        let now = Instant::now();
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                inserted_at: now,
                expires_at: now + ttl,
            },
        );
        debug!("[{}] stored '{}' for {}", self.name, key, humantime::format_duration(ttl));
    }

    /// Drop the entry for `key`, including its stale fallback
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            debug!("[{}] invalidated '{}'", self.name, key);
        }
        removed
    }

    /// Return the cached value or build it with `populate`.
    ///
    /// At most one `populate` runs per key at a time. Callers arriving while a
    /// population is in flight wait for it and receive its result, so a failed
    /// attempt fails every caller that joined it. Errors are never stored; the
    /// next request after the attempt settles starts a new one.
    pub async fn get_or_try_populate<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        populate: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let flight = self.join_flight(key);
        let initiated = AtomicBool::new(false);
        let result = flight
            .get_or_init(|| {
                initiated.store(true, Ordering::Relaxed);
                async move {
                    // A previous attempt may have stored the value since our miss
                    if let Some(value) = self.fresh(key) {
                        self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                        return Ok(value);
                    }
                    self.counters.populations.fetch_add(1, Ordering::Relaxed);
                    let result = populate().await;
                    if let Ok(value) = &result {
                        self.put(key, value.clone(), ttl);
                    }
                    result
                }
            })
            .await
            .clone();

        if initiated.load(Ordering::Relaxed) {
            self.in_flight
                .remove_if(key, |_, current| Arc::ptr_eq(current, &flight));
        } else {
            self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
            debug!("[{}] '{}' joined a concurrent population", self.name, key);
        }

        result
    }

    /// Remove entries that expired more than `retention` ago, returning the
    /// number removed
    pub fn purge_stale(&self, retention: Duration) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now < entry.expires_at + retention);
        // Abandoned attempts nobody is waiting on can go as well
        self.in_flight
            .retain(|_, flight| Arc::strong_count(flight) > 1);
        before.saturating_sub(self.entries.len())
    }

    /// Age of the entry for `key`, if any
    pub fn age(&self, key: &str) -> Option<Duration> {
        self.entries
            .get(key)
            .map(|entry| Instant::now().saturating_duration_since(entry.inserted_at))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            name: self.name,
            entries: self.entries.len(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            populations: self.counters.populations.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            stale_reads: self.counters.stale_reads.load(Ordering::Relaxed),
        }
    }

    fn fresh(&self, key: &str) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.is_expired(Instant::now()) {
            None
        } else {
            Some(entry.value.clone())
        }
    }

    fn join_flight(&self, key: &str) -> Flight<V, E> {
        // The map guard is dropped at the end of this statement, before any await
        self.in_flight.entry(key.to_string()).or_default().clone()
    }
}

/// A cache the housekeeper can purge
pub trait Purgeable: Send + Sync {
    fn cache_name(&self) -> &'static str;
    fn purge(&self, retention: Duration) -> usize;
}

impl<V: Clone + Send + Sync, E: Clone + Send + Sync> Purgeable for FeedCache<V, E> {
    fn cache_name(&self) -> &'static str {
        self.name
    }

    fn purge(&self, retention: Duration) -> usize {
        self.purge_stale(retention)
    }
}

/// Periodically purge long-expired entries from `caches`
pub fn spawn_housekeeper(
    caches: Vec<Arc<dyn Purgeable>>,
    interval: Duration,
    retention: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;

        info!(
            "Cache housekeeper started: interval={} retention={}",
            humantime::format_duration(interval),
            humantime::format_duration(retention)
        );

        loop {
            ticker.tick().await;
            for cache in &caches {
                let purged = cache.purge(retention);
                if purged > 0 {
                    info!("[{}] purged {} stale entries", cache.cache_name(), purged);
                } else {
                    debug!("[{}] nothing to purge", cache.cache_name());
                }
            }
        }
    })
}
