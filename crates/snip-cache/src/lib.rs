//! Cache implementations shared across snip services.

pub mod moka;
pub mod rate_limit;
pub mod redis;

pub use self::moka::{CacheConfig, MokaUrlCache};
pub use self::rate_limit::{RateLimit, RateLimiter};
pub use self::redis::RedisUrlCache;
pub use snip_core::cache::{Result, UrlCache};
pub use snip_core::CacheError;
