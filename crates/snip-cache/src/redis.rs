use async_trait::async_trait;
use redis::AsyncCommands;
use snip_core::cache::{Result, UrlCache};
use snip_core::{CacheError, ShortCode};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Key prefix used when none is configured.
pub const DEFAULT_KEY_PREFIX: &str = "snip:";

/// A Redis-based implementation of [`UrlCache`].
///
/// Mappings are stored as plain strings under `{prefix}url:{code}` and
/// counters under `{prefix}{key}`. Because every instance talks to the same
/// server, counters are shared, which is what makes [`crate::RateLimiter`]
/// correct behind a load balancer.
#[derive(Debug, Clone)]
pub struct RedisUrlCache {
    conn: redis::aio::MultiplexedConnection,
    key_prefix: String,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if message.to_ascii_lowercase().contains("timed out") {
        CacheError::Timeout(message)
    } else if err.is_io_error() {
        CacheError::Unavailable(message)
    } else {
        CacheError::Operation(message)
    }
}

impl RedisUrlCache {
    /// Creates a new Redis URL cache.
    ///
    /// # Arguments
    ///
    /// * `conn` - A multiplexed Redis connection
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self::with_prefix(conn, DEFAULT_KEY_PREFIX)
    }

    /// Creates a new Redis URL cache with a custom key prefix.
    ///
    /// # Arguments
    ///
    /// * `conn` - A multiplexed Redis connection
    /// * `key_prefix` - Custom prefix for cache keys (e.g., "myapp:")
    pub fn with_prefix(
        conn: redis::aio::MultiplexedConnection,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    /// Opens a connection to `redis_url` and wraps it.
    pub async fn connect(redis_url: &str, key_prefix: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| CacheError::Initialization(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| map_redis_error("failed to connect to Redis", e))?;
        Ok(Self::with_prefix(conn, key_prefix))
    }

    fn url_key(&self, code: &ShortCode) -> String {
        format!("{}url:{}", self.key_prefix, code.as_str())
    }

    fn counter_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl UrlCache for RedisUrlCache {
    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>> {
        let key = self.url_key(code);
        trace!(code = %code, "Fetching URL from Redis cache");

        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(url)) => {
                debug!(code = %code, "Cache hit in Redis");
                Ok(Some(url))
            }
            Ok(None) => {
                trace!(code = %code, "Cache miss in Redis");
                Ok(None)
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Redis error on get");
                Err(map_redis_error("failed to fetch value from Redis", e))
            }
        }
    }

    async fn set_url(&self, code: &ShortCode, url: &str, ttl: Option<Duration>) -> Result<()> {
        let key = self.url_key(code);
        trace!(code = %code, ttl = ?ttl, "Storing URL in Redis cache");

        let mut conn = self.conn.clone();
        let result = match ttl {
            // SETEX rejects a zero TTL
            Some(ttl) => {
                conn.set_ex::<_, _, ()>(&key, url, ttl.as_secs().max(1))
                    .await
            }
            None => conn.set::<_, _, ()>(&key, url).await,
        };

        match result {
            Ok(()) => {
                debug!(code = %code, "Cached URL in Redis");
                Ok(())
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Failed to cache URL in Redis");
                Err(map_redis_error("failed to write value to Redis", e))
            }
        }
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        let key = self.url_key(code);
        trace!(code = %code, "Removing URL from Redis cache");

        let mut conn = self.conn.clone();
        match conn.del::<_, ()>(&key).await {
            Ok(()) => {
                debug!(code = %code, "Removed URL from Redis cache");
                Ok(())
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Failed to remove URL from Redis cache");
                Err(map_redis_error("failed to delete value from Redis", e))
            }
        }
    }

    async fn incr(&self, key: &str, ttl: Option<Duration>) -> Result<u64> {
        let key = self.counter_key(key);
        let mut conn = self.conn.clone();

        let value: u64 = match ttl {
            Some(ttl) => {
                // NX keeps the expiry set by the first increment of the window.
                let (value,): (u64,) = redis::pipe()
                    .atomic()
                    .incr(&key, 1_u64)
                    .cmd("EXPIRE")
                    .arg(&key)
                    .arg(ttl.as_secs().max(1))
                    .arg("NX")
                    .ignore()
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| map_redis_error("failed to increment counter in Redis", e))?;
                value
            }
            None => conn
                .incr::<_, _, u64>(&key, 1_u64)
                .await
                .map_err(|e| map_redis_error("failed to increment counter in Redis", e))?,
        };

        trace!(key = %key, value, "Incremented Redis counter");
        Ok(value)
    }
}
