//! In-memory response cache with per-read TTLs.
//!
//! Entries are stored with the time they were entered; the TTL is supplied by
//! each read, so one entry may be fresh for one caller and expired for
//! another.

use bytes::Bytes;
use dashmap::DashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use traffic_ops_core::types::CacheHitStatus;

/// Source of "now" for expiry checks.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset_ms: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset_ms: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }
}

/// A cached response body.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub entered: Instant,
    pub bytes: Bytes,
    pub remote_addr: Option<SocketAddr>,
}

#[derive(Debug, Clone)]
enum CacheLookup {
    Hit(CacheEntry),
    Expired,
    Miss,
}

impl CacheLookup {
    fn status(&self) -> CacheHitStatus {
        match self {
            Self::Hit(_) => CacheHitStatus::Hit,
            Self::Expired => CacheHitStatus::Expired,
            Self::Miss => CacheHitStatus::Miss,
        }
    }
}

/// Concurrent map from request path to the last response body.
#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Serve `key` from the cache while younger than `ttl`, otherwise run
    /// `fetch` and store its result.
    ///
    /// Concurrent misses on the same key may each fetch; the last write wins.
    /// A failed fetch leaves any previous entry untouched.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, ttl: Duration, fetch: F) -> Result<(CacheEntry, CacheHitStatus), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(Bytes, Option<SocketAddr>), E>>,
    {
        let status = match self.lookup(key, ttl) {
            CacheLookup::Hit(entry) => return Ok((entry, CacheHitStatus::Hit)),
            miss => miss.status(),
        };

        let (bytes, remote_addr) = fetch().await?;
        let entry = self.store(key, bytes, remote_addr);
        Ok((entry, status))
    }

    /// Look up `key`, treating entries older than `ttl` as expired.
    fn lookup(&self, key: &str, ttl: Duration) -> CacheLookup {
        let lookup = match self.entries.get(key) {
            Some(entry) if self.clock.now().saturating_duration_since(entry.entered) < ttl => {
                CacheLookup::Hit(entry.clone())
            }
            Some(_) => CacheLookup::Expired,
            None => CacheLookup::Miss,
        };

        tracing::debug!(key = key, status = %lookup.status(), "Response cache lookup");
        metrics::counter!(
            "traffic_ops_client_cache_total",
            "status" => lookup.status().as_str()
        )
        .increment(1);
        lookup
    }

    /// Insert or replace the entry for `key`, stamped with the current time.
    fn store(&self, key: &str, bytes: Bytes, remote_addr: Option<SocketAddr>) -> CacheEntry {
        let entry = CacheEntry {
            entered: self.clock.now(),
            bytes,
            remote_addr,
        };
        self.entries.insert(key.to_string(), entry.clone());
        entry
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_expire_after_ttl() {
        let clock = Arc::new(ManualClock::new());
        let cache = ResponseCache::with_clock(clock.clone());
        let ttl = Duration::from_secs(60);

        assert!(matches!(cache.lookup("/api/2.0/cdn", ttl), CacheLookup::Miss));

        cache.store("/api/2.0/cdn", Bytes::from_static(b"[]"), None);
        clock.advance(Duration::from_secs(59));
        assert!(matches!(cache.lookup("/api/2.0/cdn", ttl), CacheLookup::Hit(_)));

        clock.advance(Duration::from_secs(1));
        assert!(matches!(cache.lookup("/api/2.0/cdn", ttl), CacheLookup::Expired));

        // A shorter read TTL sees the same entry as stale sooner.
        cache.store("/api/2.0/cdn", Bytes::from_static(b"[]"), None);
        clock.advance(Duration::from_secs(5));
        assert!(matches!(cache.lookup("/api/2.0/cdn", Duration::from_secs(1)), CacheLookup::Expired));
        assert!(matches!(cache.lookup("/api/2.0/cdn", ttl), CacheLookup::Hit(_)));
    }

    #[tokio::test]
    async fn get_or_fetch_only_fetches_on_miss_or_expiry() {
        let clock = Arc::new(ManualClock::new());
        let cache = ResponseCache::with_clock(clock.clone());
        let ttl = Duration::from_secs(60);
        let fetches = AtomicU64::new(0);
        let fetch = || {
            fetches.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ()>((Bytes::from_static(b"[]"), None)) }
        };

        let (_, status) = cache.get_or_fetch("/api/2.0/cdn", ttl, fetch).await.unwrap();
        assert_eq!(status, CacheHitStatus::Miss);
        let (_, status) = cache.get_or_fetch("/api/2.0/cdn", ttl, fetch).await.unwrap();
        assert_eq!(status, CacheHitStatus::Hit);

        clock.advance(ttl);
        let (_, status) = cache.get_or_fetch("/api/2.0/cdn", ttl, fetch).await.unwrap();
        assert_eq!(status, CacheHitStatus::Expired);
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_the_old_entry() {
        let clock = Arc::new(ManualClock::new());
        let cache = ResponseCache::with_clock(clock.clone());
        cache.store("/api/2.0/asn", Bytes::from_static(b"old"), None);
        clock.advance(Duration::from_secs(10));

        let result = cache
            .get_or_fetch("/api/2.0/asn", Duration::from_secs(1), || async { Err::<(Bytes, Option<SocketAddr>), _>("down") })
            .await;
        assert_eq!(result.unwrap_err(), "down");
        assert_eq!(cache.len(), 1);
        assert!(matches!(cache.lookup("/api/2.0/asn", Duration::from_secs(60)), CacheLookup::Hit(ref e) if e.bytes == Bytes::from_static(b"old")));
    }

    #[test]
    fn hits_return_the_stored_remote_addr() {
        let cache = ResponseCache::new();
        let addr: SocketAddr = "10.0.0.1:443".parse().unwrap();
        cache.store("/api/2.0/asn", Bytes::from_static(b"x"), Some(addr));

        match cache.lookup("/api/2.0/asn", Duration::from_secs(10)) {
            CacheLookup::Hit(entry) => {
                assert_eq!(entry.remote_addr, Some(addr));
                assert_eq!(entry.bytes, Bytes::from_static(b"x"));
            }
            other => panic!("expected hit, got {:?}", other),
        }
    }
}
