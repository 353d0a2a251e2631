use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use snip_core::cache::{Result, UrlCache};
use snip_core::ShortCode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use typed_builder::TypedBuilder;

const DEFAULT_MAX_CAPACITY: u64 = 10_000;

#[derive(Debug, Clone)]
struct CachedUrl {
    url: String,
    ttl: Option<Duration>,
}

#[derive(Debug)]
struct Counter {
    value: AtomicU64,
    ttl: Option<Duration>,
}

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, CachedUrl> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedUrl,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    // A rewrite of the mapping restarts its lifetime.
    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedUrl,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

impl Expiry<String, Arc<Counter>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Arc<Counter>,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// An in-memory cache implementation using Moka.
///
/// Suited to single-node deployments and tests. Counters live in the same
/// process, so rate limits built on this cache are per instance.
#[derive(Debug, Clone)]
pub struct MokaUrlCache {
    urls: Cache<String, CachedUrl>,
    counters: Cache<String, Arc<Counter>>,
}

impl MokaUrlCache {
    /// Creates a new Moka URL cache with default settings.
    ///
    /// The cache will have a default maximum capacity of 10,000 entries.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }

    /// Creates a new Moka URL cache with a custom maximum capacity.
    pub fn with_capacity(max_capacity: u64) -> Self {
        CacheConfig::builder().max_capacity(max_capacity).build().into()
    }

    /// Returns a builder for creating a custom cache configuration.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfig::builder()
    }
}

impl Default for MokaUrlCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlCache for MokaUrlCache {
    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>> {
        trace!(code = %code, "Fetching URL from Moka cache");

        match self.urls.get(code.as_str()).await {
            Some(entry) => {
                debug!(code = %code, "Cache hit in Moka");
                Ok(Some(entry.url))
            }
            None => {
                trace!(code = %code, "Cache miss in Moka");
                Ok(None)
            }
        }
    }

    async fn set_url(&self, code: &ShortCode, url: &str, ttl: Option<Duration>) -> Result<()> {
        trace!(code = %code, ttl = ?ttl, "Storing URL in Moka cache");

        let entry = CachedUrl {
            url: url.to_string(),
            ttl,
        };
        self.urls.insert(code.as_str().to_string(), entry).await;
        debug!(code = %code, "Cached URL in Moka");
        Ok(())
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        trace!(code = %code, "Removing URL from Moka cache");

        self.urls.invalidate(code.as_str()).await;
        debug!(code = %code, "Removed URL from Moka cache (if present)");
        Ok(())
    }

    async fn incr(&self, key: &str, ttl: Option<Duration>) -> Result<u64> {
        let counter = self
            .counters
            .entry(key.to_string())
            .or_insert_with(async {
                Arc::new(Counter {
                    value: AtomicU64::new(0),
                    ttl,
                })
            })
            .await
            .into_value();

        let value = counter.value.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(key, value, "Incremented Moka counter");
        Ok(value)
    }
}

/// Configuration for creating a MokaUrlCache with custom settings.
///
/// `ttl` and `tti` bound every entry on top of the per-entry TTL given to
/// [`UrlCache::set_url`]; the earliest expiry wins.
#[derive(Debug, TypedBuilder, Default)]
pub struct CacheConfig {
    /// Maximum number of URL mappings the cache can hold.
    #[builder(default, setter(strip_option))]
    max_capacity: Option<u64>,
    /// Upper bound on the lifetime of any mapping.
    #[builder(default, setter(strip_option))]
    ttl: Option<Duration>,
    /// Time-to-idle for mappings.
    #[builder(default, setter(strip_option))]
    tti: Option<Duration>,
}

impl From<CacheConfig> for MokaUrlCache {
    fn from(config: CacheConfig) -> Self {
        let mut builder = Cache::<String, CachedUrl>::builder().expire_after(PerEntryTtl);

        if let Some(capacity) = config.max_capacity {
            builder = builder.max_capacity(capacity);
        }

        if let Some(ttl) = config.ttl {
            builder = builder.time_to_live(ttl);
        }

        if let Some(tti) = config.tti {
            builder = builder.time_to_idle(tti);
        }

        let mut counters = Cache::<String, Arc<Counter>>::builder().expire_after(PerEntryTtl);
        if let Some(capacity) = config.max_capacity {
            counters = counters.max_capacity(capacity);
        }

        MokaUrlCache {
            urls: builder.build(),
            counters: counters.build(),
        }
    }
}
