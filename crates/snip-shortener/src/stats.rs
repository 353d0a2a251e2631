use crate::error::{Result, ShortenerError};
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use snip_core::{ReadRepository, ShortCode, UrlRecord};
use std::sync::Arc;
use tracing::trace;

/// Metadata and counters of a short link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlStats {
    pub short_code: ShortCode,
    pub original_url: String,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
    /// Resolutions served through the record store. Cache hits are counted
    /// separately and are not included.
    pub access_count: u64,
}

impl From<UrlRecord> for UrlStats {
    fn from(record: UrlRecord) -> Self {
        Self {
            short_code: record.short_code,
            original_url: record.original_url,
            created_at: record.created_at,
            expires_at: record.expires_at,
            access_count: record.access_count,
        }
    }
}

#[async_trait]
pub trait Stats: Send + Sync + 'static {
    async fn stats(&self, code: &ShortCode) -> Result<UrlStats>;
}

/// Read-only projection over the record store.
///
/// Neither the cache nor expiry is consulted: a record that has expired but
/// not been reaped yet is reported with its stored `expires_at`.
pub struct StatsService<R> {
    repository: Arc<R>,
}

impl<R: ReadRepository> StatsService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<R: ReadRepository> Stats for StatsService<R> {
    async fn stats(&self, code: &ShortCode) -> Result<UrlStats> {
        trace!(code = %code, "Loading stats");

        self.repository
            .find_by_code(code)
            .await?
            .map(UrlStats::from)
            .ok_or_else(|| ShortenerError::NotFound(code.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;
    use snip_core::{NewUrlRecord, Repository};
    use snip_storage::InMemoryRepository;

    fn created_at() -> Timestamp {
        "2026-03-01T12:00:00Z".parse().unwrap()
    }

    async fn seeded(expires_at: Option<Timestamp>) -> (StatsService<InMemoryRepository>, UrlRecord) {
        let repository = Arc::new(InMemoryRepository::new());
        let record = repository
            .insert(NewUrlRecord {
                original_url: "https://example.com".to_string(),
                short_code: ShortCode::new_unchecked("abc123"),
                created_at: created_at(),
                expires_at,
            })
            .await
            .unwrap();
        (StatsService::new(repository), record)
    }

    #[tokio::test]
    async fn stats_reports_record_metadata() {
        let expires_at = created_at() + SignedDuration::from_hours(24);
        let (service, _) = seeded(Some(expires_at)).await;

        let stats = service
            .stats(&ShortCode::new_unchecked("abc123"))
            .await
            .unwrap();

        assert_eq!(
            stats,
            UrlStats {
                short_code: ShortCode::new_unchecked("abc123"),
                original_url: "https://example.com".to_string(),
                created_at: created_at(),
                expires_at: Some(expires_at),
                access_count: 0,
            }
        );
    }

    #[tokio::test]
    async fn stats_unknown_code_is_not_found() {
        let (service, _) = seeded(None).await;

        let err = service
            .stats(&ShortCode::new_unchecked("missing"))
            .await
            .unwrap_err();

        assert!(matches!(err, ShortenerError::NotFound(ref c) if c == "missing"));
    }

    #[tokio::test]
    async fn stats_includes_expired_but_unreaped_records() {
        let expired = created_at() - SignedDuration::from_hours(1);
        let (service, record) = seeded(Some(expired)).await;

        let stats = service.stats(&record.short_code).await.unwrap();

        assert_eq!(stats.expires_at, Some(expired));
    }

    #[tokio::test]
    async fn stats_reflects_access_count() {
        let repository = Arc::new(InMemoryRepository::new());
        let record = repository
            .insert(NewUrlRecord {
                original_url: "https://example.com".to_string(),
                short_code: ShortCode::new_unchecked("counted"),
                created_at: created_at(),
                expires_at: None,
            })
            .await
            .unwrap();
        repository.increment_access_count(&record).await.unwrap();
        repository.increment_access_count(&record).await.unwrap();

        let stats = StatsService::new(repository)
            .stats(&record.short_code)
            .await
            .unwrap();

        assert_eq!(stats.access_count, 2);
    }

    #[test]
    fn timestamps_serialize_as_rfc3339() {
        let stats = UrlStats {
            short_code: ShortCode::new_unchecked("abc123"),
            original_url: "https://example.com".to_string(),
            created_at: created_at(),
            expires_at: None,
            access_count: 5,
        };

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["short_code"], "abc123");
        assert_eq!(json["created_at"], "2026-03-01T12:00:00Z");
        assert!(json["expires_at"].is_null());
        assert_eq!(json["access_count"], 5);
    }
}
