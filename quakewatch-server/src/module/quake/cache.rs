///! TTL-based in-memory snapshot cache with stale fallback
///!
///! Holds the most recent successfully fetched bulletin snapshot. Freshness
///! is best-effort: once any snapshot has ever been fetched, a transient
///! upstream outage never surfaces to callers as an error.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use super::error::QuakeError;
use super::fetcher::FetchSnapshot;
use super::types::{Quake, QuakeSnapshot};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Most-recently-fetched snapshot plus refresh policy.
pub struct SnapshotCache {
    fetcher: Arc<dyn FetchSnapshot>,
    ttl: Duration,
    /// None until the first successful fetch
    snapshot: RwLock<Option<QuakeSnapshot>>,
    /// Serializes refreshes so concurrent cache misses trigger one upstream
    /// fetch; late arrivals re-check freshness after acquiring it.
    refresh_guard: Mutex<()>,
}

impl SnapshotCache {
    pub fn new(fetcher: Arc<dyn FetchSnapshot>, ttl: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            snapshot: RwLock::new(None),
            refresh_guard: Mutex::new(()),
        }
    }

    /// Age of the cached snapshot, if one exists.
    pub async fn age(&self) -> Option<Duration> {
        let guard = self.snapshot.read().await;
        guard
            .as_ref()
            .and_then(|snap| (Utc::now() - snap.fetched_at).to_std().ok())
    }

    /// Clone of the cached snapshot, if one exists.
    pub async fn current(&self) -> Option<QuakeSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Return the cached entries, fetching upstream when the cache is
    /// absent, expired, or `force` is set.
    ///
    /// On fetch failure a stale snapshot is still returned when one exists;
    /// only a cold-start failure (nothing ever fetched) propagates, as
    /// [`QuakeError::UpstreamUnavailable`].
    pub async fn get_or_refresh(&self, force: bool) -> Result<Vec<Quake>, QuakeError> {
        if !force {
            if let Some(quakes) = self.fresh_entries().await {
                return Ok(quakes);
            }
        }

        let _guard = self.refresh_guard.lock().await;

        // Another caller may have refreshed while we waited for the guard.
        if !force {
            if let Some(quakes) = self.fresh_entries().await {
                return Ok(quakes);
            }
        }

        match self.refresh().await {
            Ok(snapshot) => Ok(snapshot.quakes),
            Err(e) => {
                let guard = self.snapshot.read().await;
                match guard.as_ref() {
                    Some(stale) => {
                        tracing::warn!(
                            "Bulletin refresh failed ({}), serving stale snapshot from {}",
                            e,
                            stale.fetched_at
                        );
                        Ok(stale.quakes.clone())
                    }
                    None => {
                        tracing::error!("Bulletin refresh failed with no cached fallback: {}", e);
                        Err(QuakeError::UpstreamUnavailable)
                    }
                }
            }
        }
    }

    /// Unconditional fetch-and-store. Used by the poller, which handles
    /// failures itself (no stale fallback here).
    pub async fn refresh(&self) -> Result<QuakeSnapshot, QuakeError> {
        let snapshot = self.fetcher.fetch_snapshot().await?;
        *self.snapshot.write().await = Some(snapshot.clone());
        Ok(snapshot)
    }

    async fn fresh_entries(&self) -> Option<Vec<Quake>> {
        let guard = self.snapshot.read().await;
        let snap = guard.as_ref()?;
        let age = (Utc::now() - snap.fetched_at).to_std().ok()?;
        if age < self.ttl {
            Some(snap.quakes.clone())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    fn quake(id: &str) -> Quake {
        Quake {
            id: id.to_string(),
            datetime: "30 August 2026 - 08:15 PM".to_string(),
            latitude: 12.0,
            longitude: 124.0,
            depth: 10.0,
            magnitude: 4.0,
            location: "somewhere".to_string(),
            detail_url: None,
        }
    }

    struct FakeFetcher {
        calls: AtomicU32,
        failing: AtomicBool,
    }

    impl FakeFetcher {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                failing: AtomicBool::new(false),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FetchSnapshot for FakeFetcher {
        async fn fetch_snapshot(&self) -> Result<QuakeSnapshot, QuakeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.failing.load(Ordering::SeqCst) {
                Err(QuakeError::RetriesExhausted {
                    attempts: 3,
                    source: Box::new(QuakeError::EmptyExtraction),
                })
            } else {
                Ok(QuakeSnapshot::new(vec![quake(&format!("q{call}"))]))
            }
        }
    }

    #[tokio::test]
    async fn test_second_read_within_ttl_hits_cache() {
        let fetcher = FakeFetcher::new();
        let cache = SnapshotCache::new(fetcher.clone(), DEFAULT_TTL);

        let first = cache.get_or_refresh(false).await.unwrap();
        let second = cache.get_or_refresh(false).await.unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(first[0].id, second[0].id);
    }

    #[tokio::test]
    async fn test_concurrent_misses_trigger_single_fetch() {
        let fetcher = FakeFetcher::new();
        let cache = Arc::new(SnapshotCache::new(fetcher.clone(), DEFAULT_TTL));

        // Two callers race on an empty cache; the loser of the refresh
        // guard must re-check freshness instead of fetching again
        let first = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get_or_refresh(false).await }
        });
        let second = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get_or_refresh(false).await }
        });

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(first[0].id, second[0].id);
    }

    #[tokio::test]
    async fn test_force_bypasses_ttl() {
        let fetcher = FakeFetcher::new();
        let cache = SnapshotCache::new(fetcher.clone(), DEFAULT_TTL);

        cache.get_or_refresh(false).await.unwrap();
        let refreshed = cache.get_or_refresh(true).await.unwrap();

        assert_eq!(fetcher.calls(), 2);
        assert_eq!(refreshed[0].id, "q2");
    }

    #[tokio::test]
    async fn test_stale_fallback_on_fetch_failure() {
        let fetcher = FakeFetcher::new();
        let cache = SnapshotCache::new(fetcher.clone(), DEFAULT_TTL);

        cache.get_or_refresh(false).await.unwrap();
        fetcher.failing.store(true, Ordering::SeqCst);

        // Forced refresh fails upstream but never errors once data exists
        let stale = cache.get_or_refresh(true).await.unwrap();
        assert_eq!(stale[0].id, "q1");
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_cold_start_failure_propagates() {
        let fetcher = FakeFetcher::new();
        fetcher.failing.store(true, Ordering::SeqCst);
        let cache = SnapshotCache::new(fetcher.clone(), DEFAULT_TTL);

        let err = cache.get_or_refresh(false).await.unwrap_err();
        assert!(matches!(err, QuakeError::UpstreamUnavailable));
    }

    #[tokio::test]
    async fn test_expired_snapshot_refetches() {
        let fetcher = FakeFetcher::new();
        let cache = SnapshotCache::new(fetcher.clone(), Duration::ZERO);

        cache.get_or_refresh(false).await.unwrap();
        let second = cache.get_or_refresh(false).await.unwrap();

        assert_eq!(fetcher.calls(), 2);
        assert_eq!(second[0].id, "q2");
    }

    #[tokio::test]
    async fn test_refresh_stores_snapshot() {
        let fetcher = FakeFetcher::new();
        let cache = SnapshotCache::new(fetcher.clone(), DEFAULT_TTL);

        assert!(cache.current().await.is_none());
        cache.refresh().await.unwrap();
        assert!(cache.current().await.is_some());
        assert!(cache.age().await.is_some());
    }
}
