use async_trait::async_trait;
use jiff::Timestamp;
use snip_core::{Clock, SystemClock, UrlCache};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Admission policy for rate-limited operations.
#[async_trait]
pub trait RateLimit: Send + Sync + 'static {
    /// Records one call of `operation` by `identity` and reports whether it
    /// may proceed.
    async fn check(&self, identity: &str, operation: &str) -> bool;
}

/// Fixed-window limiter that keeps its counters in a [`UrlCache`].
///
/// The limiter itself holds no mutable state: each window is a counter key
/// `ratelimit:{operation}:{identity}:{window_index}` that expires with the
/// window. Backed by a shared cache such as Redis, every instance sees the
/// same counts.
pub struct RateLimiter<C> {
    cache: Arc<C>,
    limit: u64,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl<C: UrlCache> RateLimiter<C> {
    /// Allows `limit` calls per `window` for each identity and operation.
    pub fn new(cache: Arc<C>, limit: u64, window: Duration) -> Self {
        Self {
            cache,
            limit,
            window: window.max(Duration::from_secs(1)),
            clock: Arc::new(SystemClock),
        }
    }

    /// Reads window boundaries from `clock` instead of the system time.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn window_key(&self, identity: &str, operation: &str, now: Timestamp) -> String {
        let window_secs = i64::try_from(self.window.as_secs()).unwrap_or(i64::MAX);
        let index = now.as_second().div_euclid(window_secs);
        format!("ratelimit:{operation}:{identity}:{index}")
    }
}

#[async_trait]
impl<C: UrlCache> RateLimit for RateLimiter<C> {
    async fn check(&self, identity: &str, operation: &str) -> bool {
        let key = self.window_key(identity, operation, self.clock.now());

        match self.cache.incr(&key, Some(self.window)).await {
            Ok(count) if count <= self.limit => true,
            Ok(count) => {
                debug!(identity, operation, count, limit = self.limit, "rate limit exceeded");
                false
            }
            Err(e) => {
                // The cache is best-effort; an outage must not take writes down with it.
                warn!(identity, operation, error = %e, "rate limit counter unavailable, allowing request");
                true
            }
        }
    }
}
