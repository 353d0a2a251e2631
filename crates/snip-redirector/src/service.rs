use std::sync::Arc;

use crate::error::{RedirectorError, Result};
use crate::redirector::Redirector;
use async_trait::async_trait;
use snip_core::{
    hit_counter_key, CacheLifetime, Clock, Repository, ShortCode, SystemClock, UrlCache, UrlRecord,
};
use tracing::{debug, trace, warn};

/// Service for handling URL redirects.
///
/// A cache hit returns immediately and only bumps the cache-resident hit
/// counter; it neither checks expiry nor touches `access_count`. A miss reads
/// the record store, reaps the record if it has expired, increments
/// `access_count` and writes the mapping back to the cache.
pub struct RedirectorService<R, C> {
    repository: Arc<R>,
    cache: Arc<C>,
    clock: Arc<dyn Clock>,
}

impl<R: Repository, C: UrlCache> RedirectorService<R, C> {
    /// Creates a new RedirectorService over the given store and cache.
    pub fn new(repository: Arc<R>, cache: Arc<C>) -> Self {
        Self {
            repository,
            cache,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn probe_cache(&self, code: &ShortCode) -> Option<String> {
        match self.cache.get_url(code).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(code = %code, error = %e, "Cache lookup failed, falling back to store");
                None
            }
        }
    }

    /// Counts a cache hit without holding up the redirect.
    fn record_hit(&self, code: &ShortCode) {
        let cache = Arc::clone(&self.cache);
        let key = hit_counter_key(code);

        tokio::spawn(async move {
            if let Err(e) = cache.incr(&key, None).await {
                warn!(key = %key, error = %e, "Failed to count cache hit");
            }
        });
    }

    async fn reap(&self, record: &UrlRecord) {
        match self.repository.delete(record).await {
            Ok(true) => debug!(code = %record.short_code, "Reaped expired record"),
            Ok(false) => trace!(code = %record.short_code, "Expired record already gone"),
            Err(e) => warn!(code = %record.short_code, error = %e, "Failed to reap expired record"),
        }
    }

    async fn repair_cache(&self, record: &UrlRecord, lifetime: CacheLifetime) {
        // Less than a second left: the record is about to die, don't cache it.
        let Some(ttl) = lifetime.ttl() else {
            return;
        };

        if let Err(e) = self
            .cache
            .set_url(&record.short_code, &record.original_url, ttl)
            .await
        {
            warn!(code = %record.short_code, error = %e, "Failed to repopulate cache");
        }
    }
}

#[async_trait]
impl<R: Repository, C: UrlCache> Redirector for RedirectorService<R, C> {
    async fn resolve(&self, code: &ShortCode) -> Result<String> {
        trace!(code = %code, "resolving short code");

        if let Some(url) = self.probe_cache(code).await {
            self.record_hit(code);
            return Ok(url);
        }

        let Some(record) = self.repository.find_by_code(code).await? else {
            trace!(code = %code, "Short code not found");
            return Err(RedirectorError::NotFound(code.to_string()));
        };

        let now = self.clock.now();
        if record.is_expired_at(now) {
            debug!(code = %code, "Record has expired");
            self.reap(&record).await;
            return Err(RedirectorError::Expired(code.to_string()));
        }

        if !self.repository.increment_access_count(&record).await? {
            // Deleted between the lookup and the increment.
            return Err(RedirectorError::NotFound(code.to_string()));
        }

        self.repair_cache(&record, CacheLifetime::until(record.expires_at, now))
            .await;

        debug!(code = %code, url = %record.original_url, "Resolved short code");
        Ok(record.original_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::{SignedDuration, Timestamp};
    use snip_cache::MokaUrlCache;
    use snip_core::{CacheError, ManualClock, NewUrlRecord, ReadRepository, StorageError};
    use snip_generator::DigestGenerator;
    use snip_shortener::{ShortenParams, Shortener, ShortenerService, Stats, StatsService};
    use snip_storage::InMemoryRepository;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn start() -> Timestamp {
        "2026-01-01T00:00:00Z".parse().unwrap()
    }

    async fn insert(
        repository: &InMemoryRepository,
        c: &str,
        expires_at: Option<Timestamp>,
    ) -> UrlRecord {
        repository
            .insert(NewUrlRecord {
                original_url: "https://example.com".to_string(),
                short_code: code(c),
                created_at: start(),
                expires_at,
            })
            .await
            .unwrap()
    }

    /// A cache that never remembers anything, so every resolve takes the store path.
    struct NullCache;

    #[async_trait]
    impl UrlCache for NullCache {
        async fn get_url(&self, _code: &ShortCode) -> snip_core::cache::Result<Option<String>> {
            Ok(None)
        }

        async fn set_url(
            &self,
            _code: &ShortCode,
            _url: &str,
            _ttl: Option<Duration>,
        ) -> snip_core::cache::Result<()> {
            Ok(())
        }

        async fn del(&self, _code: &ShortCode) -> snip_core::cache::Result<()> {
            Ok(())
        }

        async fn incr(&self, _key: &str, _ttl: Option<Duration>) -> snip_core::cache::Result<u64> {
            Ok(0)
        }
    }

    struct BrokenCache;

    #[async_trait]
    impl UrlCache for BrokenCache {
        async fn get_url(&self, _code: &ShortCode) -> snip_core::cache::Result<Option<String>> {
            Err(CacheError::Timeout("get".to_string()))
        }

        async fn set_url(
            &self,
            _code: &ShortCode,
            _url: &str,
            _ttl: Option<Duration>,
        ) -> snip_core::cache::Result<()> {
            Err(CacheError::Timeout("set".to_string()))
        }

        async fn del(&self, _code: &ShortCode) -> snip_core::cache::Result<()> {
            Err(CacheError::Timeout("del".to_string()))
        }

        async fn incr(&self, _key: &str, _ttl: Option<Duration>) -> snip_core::cache::Result<u64> {
            Err(CacheError::Timeout("incr".to_string()))
        }
    }

    /// Moka cache that also remembers how often hit counters were bumped.
    #[derive(Default)]
    struct CountingCache {
        inner: MokaUrlCache,
        increments: AtomicU64,
    }

    #[async_trait]
    impl UrlCache for CountingCache {
        async fn get_url(&self, code: &ShortCode) -> snip_core::cache::Result<Option<String>> {
            self.inner.get_url(code).await
        }

        async fn set_url(
            &self,
            code: &ShortCode,
            url: &str,
            ttl: Option<Duration>,
        ) -> snip_core::cache::Result<()> {
            self.inner.set_url(code, url, ttl).await
        }

        async fn del(&self, code: &ShortCode) -> snip_core::cache::Result<()> {
            self.inner.del(code).await
        }

        async fn incr(&self, key: &str, ttl: Option<Duration>) -> snip_core::cache::Result<u64> {
            self.increments.fetch_add(1, Ordering::SeqCst);
            self.inner.incr(key, ttl).await
        }
    }

    /// Loses every record between lookup and increment.
    struct VanishingRepository(InMemoryRepository);

    #[async_trait]
    impl ReadRepository for VanishingRepository {
        async fn find_by_code(
            &self,
            code: &ShortCode,
        ) -> snip_core::repository::Result<Option<UrlRecord>> {
            self.0.find_by_code(code).await
        }
    }

    #[async_trait]
    impl Repository for VanishingRepository {
        async fn insert(&self, record: NewUrlRecord) -> snip_core::repository::Result<UrlRecord> {
            self.0.insert(record).await
        }

        async fn delete(&self, record: &UrlRecord) -> snip_core::repository::Result<bool> {
            self.0.delete(record).await
        }

        async fn increment_access_count(
            &self,
            record: &UrlRecord,
        ) -> snip_core::repository::Result<bool> {
            self.0.delete(record).await?;
            Ok(false)
        }

        async fn delete_expired(&self, now: Timestamp) -> snip_core::repository::Result<u64> {
            self.0.delete_expired(now).await
        }
    }

    #[tokio::test]
    async fn shorten_then_resolve_round_trips() {
        let repository = Arc::new(InMemoryRepository::new());
        let cache = Arc::new(MokaUrlCache::new());
        let shortener = ShortenerService::new(
            Arc::clone(&repository),
            Arc::clone(&cache),
            DigestGenerator::new(),
        );
        let redirector = RedirectorService::new(Arc::clone(&repository), Arc::clone(&cache));

        for url in [
            "https://example.com",
            "http://example.com/path?q=1#frag",
            "https://sub.example.org:8443/a/b/c",
        ] {
            let c = shortener.shorten(ShortenParams::new(url)).await.unwrap();
            assert_eq!(c.as_str().len(), 6);
            assert_eq!(redirector.resolve(&c).await.unwrap(), url);

            // and again through the store
            cache.del(&c).await.unwrap();
            assert_eq!(redirector.resolve(&c).await.unwrap(), url);
        }
    }

    #[tokio::test]
    async fn resolve_nonexistent_code() {
        let service = RedirectorService::new(
            Arc::new(InMemoryRepository::new()),
            Arc::new(MokaUrlCache::new()),
        );

        let err = service.resolve(&code("nope")).await.unwrap_err();
        assert!(matches!(err, RedirectorError::NotFound(ref c) if c == "nope"));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn store_path_counts_every_resolution() {
        let repository = Arc::new(InMemoryRepository::new());
        let clock = ManualClock::new(start());
        let shortener = ShortenerService::new(
            Arc::clone(&repository),
            Arc::new(NullCache),
            DigestGenerator::new(),
        )
        .with_clock(Arc::new(clock.clone()));
        let redirector = RedirectorService::new(Arc::clone(&repository), Arc::new(NullCache))
            .with_clock(Arc::new(clock.clone()));
        let stats = StatsService::new(Arc::clone(&repository));

        let c = shortener
            .shorten(ShortenParams::new("https://example.com").with_expiration_days(1))
            .await
            .unwrap();

        for _ in 0..3 {
            assert_eq!(redirector.resolve(&c).await.unwrap(), "https://example.com");
        }

        assert_eq!(stats.stats(&c).await.unwrap().access_count, 3);
    }

    #[tokio::test]
    async fn link_shortened_for_a_day_stops_resolving_a_day_later() {
        let repository = Arc::new(InMemoryRepository::new());
        let clock = ManualClock::new(start());
        let shortener = ShortenerService::new(
            Arc::clone(&repository),
            Arc::new(NullCache),
            DigestGenerator::new(),
        )
        .with_clock(Arc::new(clock.clone()));
        let redirector = RedirectorService::new(Arc::clone(&repository), Arc::new(NullCache))
            .with_clock(Arc::new(clock.clone()));
        let stats = StatsService::new(Arc::clone(&repository));

        let c = shortener
            .shorten(ShortenParams::new("https://example.com").with_expiration_days(1))
            .await
            .unwrap();
        let expires_at = start() + SignedDuration::from_hours(24);
        assert_eq!(redirector.resolve(&c).await.unwrap(), "https://example.com");

        clock.advance(SignedDuration::from_hours(24));

        // not reaped yet, so stats still reports the stored expiry
        let before = stats.stats(&c).await.unwrap();
        assert_eq!(before.expires_at, Some(expires_at));
        assert_eq!(before.access_count, 1);

        let err = redirector.resolve(&c).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(err, RedirectorError::Expired(_)));

        assert!(matches!(
            stats.stats(&c).await.unwrap_err(),
            snip_shortener::ShortenerError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn concurrent_store_resolutions_are_all_counted() {
        let repository = Arc::new(InMemoryRepository::new());
        insert(&repository, "hot", None).await;
        let redirector = Arc::new(RedirectorService::new(
            Arc::clone(&repository),
            Arc::new(NullCache),
        ));

        let mut handles = vec![];
        for _ in 0..50 {
            let redirector = Arc::clone(&redirector);
            handles.push(tokio::spawn(async move {
                redirector.resolve(&code("hot")).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let record = repository.find_by_code(&code("hot")).await.unwrap().unwrap();
        assert_eq!(record.access_count, 50);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn miss_repairs_cache_and_hit_skips_store() {
        let repository = Arc::new(InMemoryRepository::new());
        let cache = Arc::new(CountingCache::default());
        insert(&repository, "abc123", None).await;
        let redirector = RedirectorService::new(Arc::clone(&repository), Arc::clone(&cache));

        redirector.resolve(&code("abc123")).await.unwrap();
        assert_eq!(
            cache.get_url(&code("abc123")).await.unwrap().as_deref(),
            Some("https://example.com")
        );

        redirector.resolve(&code("abc123")).await.unwrap();

        let record = repository
            .find_by_code(&code("abc123"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.access_count, 1);

        awaitility::at_most(Duration::from_secs(5))
            .poll_interval(Duration::from_millis(20))
            .until_async(|| async { cache.increments.load(Ordering::SeqCst) == 1 })
            .await;
    }

    #[tokio::test]
    async fn expired_record_is_reaped_and_reported_as_not_found() {
        let repository = Arc::new(InMemoryRepository::new());
        let clock = ManualClock::new(start());
        insert(&repository, "expiring", Some(start() + SignedDuration::from_hours(24))).await;
        let redirector = RedirectorService::new(Arc::clone(&repository), Arc::new(NullCache))
            .with_clock(Arc::new(clock.clone()));

        assert!(redirector.resolve(&code("expiring")).await.is_ok());

        clock.advance(SignedDuration::from_hours(24));

        let err = redirector.resolve(&code("expiring")).await.unwrap_err();
        assert!(matches!(err, RedirectorError::Expired(_)));
        assert!(err.is_not_found());
        assert!(repository.is_empty());

        let err = redirector.resolve(&code("expiring")).await.unwrap_err();
        assert!(matches!(err, RedirectorError::NotFound(_)));
    }

    #[tokio::test]
    async fn record_about_to_expire_is_not_cached() {
        let repository = Arc::new(InMemoryRepository::new());
        let cache = Arc::new(MokaUrlCache::new());
        insert(
            &repository,
            "almost",
            Some(start() + SignedDuration::from_millis(500)),
        )
        .await;
        let redirector = RedirectorService::new(Arc::clone(&repository), Arc::clone(&cache))
            .with_clock(Arc::new(ManualClock::new(start())));

        assert_eq!(
            redirector.resolve(&code("almost")).await.unwrap(),
            "https://example.com"
        );
        assert!(cache.get_url(&code("almost")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn broken_cache_falls_back_to_store() {
        let repository = Arc::new(InMemoryRepository::new());
        insert(&repository, "abc123", None).await;
        let redirector = RedirectorService::new(Arc::clone(&repository), Arc::new(BrokenCache));

        assert_eq!(
            redirector.resolve(&code("abc123")).await.unwrap(),
            "https://example.com"
        );

        let record = repository
            .find_by_code(&code("abc123"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.access_count, 1);
    }

    #[tokio::test]
    async fn record_deleted_during_resolution_is_not_found() {
        let repository = VanishingRepository(InMemoryRepository::new());
        insert(&repository.0, "abc123", None).await;
        let redirector = RedirectorService::new(Arc::new(repository), Arc::new(NullCache));

        let err = redirector.resolve(&code("abc123")).await.unwrap_err();
        assert!(matches!(err, RedirectorError::NotFound(_)));
    }

    #[tokio::test]
    async fn storage_errors_are_not_masked() {
        struct DownRepository;

        #[async_trait]
        impl ReadRepository for DownRepository {
            async fn find_by_code(
                &self,
                _code: &ShortCode,
            ) -> snip_core::repository::Result<Option<UrlRecord>> {
                Err(StorageError::Unavailable("down".to_string()))
            }
        }

        #[async_trait]
        impl Repository for DownRepository {
            async fn insert(
                &self,
                _record: NewUrlRecord,
            ) -> snip_core::repository::Result<UrlRecord> {
                Err(StorageError::Unavailable("down".to_string()))
            }

            async fn delete(&self, _record: &UrlRecord) -> snip_core::repository::Result<bool> {
                Err(StorageError::Unavailable("down".to_string()))
            }

            async fn increment_access_count(
                &self,
                _record: &UrlRecord,
            ) -> snip_core::repository::Result<bool> {
                Err(StorageError::Unavailable("down".to_string()))
            }

            async fn delete_expired(&self, _now: Timestamp) -> snip_core::repository::Result<u64> {
                Err(StorageError::Unavailable("down".to_string()))
            }
        }

        let redirector = RedirectorService::new(Arc::new(DownRepository), Arc::new(NullCache));

        let err = redirector.resolve(&code("abc123")).await.unwrap_err();
        assert!(matches!(
            err,
            RedirectorError::Storage(StorageError::Unavailable(_))
        ));
        assert!(!err.is_not_found());
    }
}
