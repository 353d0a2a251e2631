use crate::error::{Result, ShortenerError};
use crate::shortener::{ShortenParams, Shortener};
use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use snip_core::{
    CacheLifetime, Clock, NewUrlRecord, Repository, ShortCode, ShortCodeError, StorageError,
    SystemClock, UrlCache, UrlRecord,
};
use snip_generator::Generator;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Number of generated candidates tried before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 16;

const SECONDS_PER_DAY: i64 = 86_400;

/// A concrete implementation of the `Shortener` trait.
///
/// This service writes through the `Repository` and then populates the
/// `UrlCache`. It handles:
/// - URL, slug and expiration validation
/// - Short code generation with bounded collision retry
/// - Cache population and invalidation
///
/// The repository's uniqueness constraint is the final arbiter of code
/// ownership: a conflicting insert regenerates a generated code and is
/// reported as [`ShortenerError::SlugConflict`] for a custom one.
pub struct ShortenerService<R, C, G> {
    repository: Arc<R>,
    cache: Arc<C>,
    generator: Arc<G>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
}

impl<R: Repository, C: UrlCache, G: Generator> ShortenerService<R, C, G> {
    pub fn new(repository: Arc<R>, cache: Arc<C>, generator: G) -> Self {
        Self {
            repository,
            cache,
            generator: Arc::new(generator),
            clock: Arc::new(SystemClock),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Caps the number of generated candidates per request (at least one).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Validates that the URL parses and has an http(s) scheme and a host.
    fn validate_url(raw: &str) -> Result<()> {
        let url = Url::parse(raw).map_err(|e| ShortenerError::InvalidUrl(format!("{raw}: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL scheme must be http or https: {}",
                url.scheme()
            )));
        }

        match url.host_str() {
            Some(host) if !host.is_empty() => Ok(()),
            _ => Err(ShortenerError::InvalidUrl(format!("URL has no host: {raw}"))),
        }
    }

    fn custom_code(slug: Option<String>) -> Result<Option<ShortCode>> {
        let Some(slug) = slug else {
            return Ok(None);
        };

        match ShortCode::new(slug) {
            Ok(code) => Ok(Some(code)),
            Err(ShortCodeError::Empty) => Ok(None),
            Err(ShortCodeError::TooLong { len, max }) => {
                Err(ShortenerError::SlugTooLong { len, max })
            }
        }
    }

    fn expires_at(now: Timestamp, days: Option<i64>) -> Result<Option<Timestamp>> {
        let Some(days) = days else {
            return Ok(None);
        };

        if days <= 0 {
            return Err(ShortenerError::InvalidExpiration(days));
        }

        // whole seconds, which is the precision every store keeps
        days.checked_mul(SECONDS_PER_DAY)
            .and_then(|secs| now.checked_add(SignedDuration::from_secs(secs)).ok())
            .and_then(|at| Timestamp::from_second(at.as_second()).ok())
            .map(Some)
            .ok_or(ShortenerError::InvalidExpiration(days))
    }

    async fn insert_custom(
        &self,
        code: ShortCode,
        original_url: String,
        now: Timestamp,
        expires_at: Option<Timestamp>,
    ) -> Result<UrlRecord> {
        if let Some(existing) = self.repository.find_by_code(&code).await? {
            if !existing.is_expired_at(now) {
                return Err(ShortenerError::SlugConflict(code.to_string()));
            }

            // The slug is held by a dead record; reap it so the slug can be reused.
            if self.repository.delete(&existing).await? {
                info!(code = %code, "Reaped expired record holding custom slug");
            }
        }

        let record = NewUrlRecord {
            original_url,
            short_code: code,
            created_at: now,
            expires_at,
        };

        match self.repository.insert(record).await {
            Ok(record) => Ok(record),
            Err(StorageError::Conflict(code)) => Err(ShortenerError::SlugConflict(code)),
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_generated(
        &self,
        original_url: String,
        now: Timestamp,
        expires_at: Option<Timestamp>,
    ) -> Result<UrlRecord> {
        for attempt in 0..self.max_attempts {
            let code = self.generator.generate(&original_url, attempt);

            if self.repository.find_by_code(&code).await?.is_some() {
                debug!(code = %code, attempt, "Generated code already taken");
                continue;
            }

            let record = NewUrlRecord {
                original_url: original_url.clone(),
                short_code: code,
                created_at: now,
                expires_at,
            };

            match self.repository.insert(record).await {
                Ok(record) => return Ok(record),
                Err(StorageError::Conflict(code)) => {
                    warn!(code = %code, attempt, "Generated code claimed concurrently, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ShortenerError::CodeSpaceExhausted(self.max_attempts))
    }

    async fn populate_cache(&self, record: &UrlRecord, now: Timestamp) {
        let Some(ttl) = CacheLifetime::until(record.expires_at, now).ttl() else {
            return;
        };

        if let Err(e) = self
            .cache
            .set_url(&record.short_code, &record.original_url, ttl)
            .await
        {
            warn!(code = %record.short_code, error = %e, "Failed to populate cache");
        }
    }
}

#[async_trait]
impl<R: Repository, C: UrlCache, G: Generator> Shortener for ShortenerService<R, C, G> {
    async fn shorten(&self, params: ShortenParams) -> Result<ShortCode> {
        Self::validate_url(&params.original_url)?;
        let custom = Self::custom_code(params.custom_slug)?;

        let now = self.clock.now();
        let expires_at = Self::expires_at(now, params.expiration_days)?;

        let record = match custom {
            Some(code) => {
                self.insert_custom(code, params.original_url, now, expires_at)
                    .await?
            }
            None => {
                self.insert_generated(params.original_url, now, expires_at)
                    .await?
            }
        };

        self.populate_cache(&record, now).await;

        info!(
            code = %record.short_code,
            expires_at = ?record.expires_at,
            "Created short link"
        );
        Ok(record.short_code)
    }

    async fn delete(&self, code: &ShortCode) -> Result<bool> {
        let Some(record) = self.repository.find_by_code(code).await? else {
            return Ok(false);
        };

        let deleted = self.repository.delete(&record).await?;

        if let Err(e) = self.cache.del(code).await {
            warn!(code = %code, error = %e, "Failed to invalidate cache entry");
        }

        if deleted {
            info!(code = %code, "Deleted short link");
        }
        Ok(deleted)
    }
}
