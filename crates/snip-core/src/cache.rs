use crate::error::CacheError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;
use std::time::Duration;

/// Type alias for cache results.
pub type Result<T> = std::result::Result<T, CacheError>;

/// A cache of short code to original URL mappings.
///
/// The cache is never authoritative: every entry can be rebuilt from the
/// record store, and implementations may evict at any time. Concurrent
/// writers to the same key simply last-write-win.
#[async_trait]
pub trait UrlCache: Send + Sync + 'static {
    /// Get the original URL cached for `code`.
    ///
    /// Returns `Ok(None)` if the key is not in the cache.
    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>>;

    /// Store the mapping with an optional TTL.
    ///
    /// If `ttl` is `None`, the entry does not expire on its own.
    async fn set_url(&self, code: &ShortCode, url: &str, ttl: Option<Duration>) -> Result<()>;

    /// Remove the mapping.
    ///
    /// It is not an error if the key does not exist.
    async fn del(&self, code: &ShortCode) -> Result<()>;

    /// Atomically increment the counter stored under `key` and return the new value.
    ///
    /// `ttl` is applied when the counter is created; an existing counter keeps
    /// its expiry.
    async fn incr(&self, key: &str, ttl: Option<Duration>) -> Result<u64>;
}

/// Key of the cache-resident hit counter for `code`.
pub fn hit_counter_key(code: &ShortCode) -> String {
    format!("hits:{}", code.as_str())
}

/// How long a mapping may live in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLifetime {
    /// The record never expires.
    Unbounded,
    /// The record expires after this many whole seconds.
    Bounded(Duration),
    /// Less than a second is left; the mapping must not be cached.
    Elapsed,
}

impl CacheLifetime {
    /// Derives the cache lifetime from a record's expiry as seen at `now`.
    pub fn until(expires_at: Option<Timestamp>, now: Timestamp) -> Self {
        let Some(expires_at) = expires_at else {
            return Self::Unbounded;
        };

        let remaining = expires_at.duration_since(now).as_secs();
        if remaining <= 0 {
            return Self::Elapsed;
        }

        Self::Bounded(Duration::from_secs(remaining.unsigned_abs()))
    }

    /// The TTL to pass to [`UrlCache::set_url`], or `None` when nothing
    /// should be cached.
    pub fn ttl(self) -> Option<Option<Duration>> {
        match self {
            Self::Unbounded => Some(None),
            Self::Bounded(ttl) => Some(Some(ttl)),
            Self::Elapsed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;

    #[test]
    fn hit_counter_key_format() {
        let code = ShortCode::new_unchecked("abc123");
        assert_eq!(hit_counter_key(&code), "hits:abc123");
    }

    #[test]
    fn lifetime_without_expiry_is_unbounded() {
        let now = Timestamp::from_second(0).unwrap();
        assert_eq!(CacheLifetime::until(None, now), CacheLifetime::Unbounded);
        assert_eq!(CacheLifetime::Unbounded.ttl(), Some(None));
    }

    #[test]
    fn lifetime_is_whole_remaining_seconds() {
        let now = Timestamp::from_second(0).unwrap();
        let expires_at = now + SignedDuration::from_millis(86_400_500);

        assert_eq!(
            CacheLifetime::until(Some(expires_at), now),
            CacheLifetime::Bounded(Duration::from_secs(86_400))
        );
    }

    #[test]
    fn lifetime_under_a_second_is_elapsed() {
        let now = Timestamp::from_second(100).unwrap();

        let almost = now + SignedDuration::from_millis(999);
        assert_eq!(CacheLifetime::until(Some(almost), now), CacheLifetime::Elapsed);

        let past = now - SignedDuration::from_secs(5);
        assert_eq!(CacheLifetime::until(Some(past), now), CacheLifetime::Elapsed);
        assert_eq!(CacheLifetime::Elapsed.ttl(), None);
    }
}
