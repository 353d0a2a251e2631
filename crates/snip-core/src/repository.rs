use crate::error::StorageError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Type alias for repository results.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A stored URL record, as owned by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// Identifier assigned by the store on insert.
    pub id: u64,
    /// The original URL that was shortened.
    pub original_url: String,
    pub short_code: ShortCode,
    pub created_at: Timestamp,
    /// When the record expires, if ever.
    pub expires_at: Option<Timestamp>,
    /// Number of resolutions served through the record store.
    pub access_count: u64,
}

impl UrlRecord {
    /// A record is dead from its `expires_at` instant onwards.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// A record that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUrlRecord {
    pub original_url: String,
    pub short_code: ShortCode,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
}

/// A read-only view of the record store.
///
/// The stats service only ever needs this half of [`Repository`].
#[async_trait]
pub trait ReadRepository: Send + Sync + 'static {
    /// Retrieves the record for a given short code, expired or not.
    /// Returns `None` if the code does not exist.
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<UrlRecord>>;
}

/// The authoritative record store.
#[async_trait]
pub trait Repository: ReadRepository {
    /// Inserts a new record and returns it with its assigned id.
    ///
    /// Returns `Err(StorageError::Conflict)` if the code is already taken.
    /// This is the only uniqueness check that holds under concurrency.
    async fn insert(&self, record: NewUrlRecord) -> Result<UrlRecord>;

    /// Deletes exactly this record (matched by id and code).
    /// Returns `true` if the record existed and was removed.
    async fn delete(&self, record: &UrlRecord) -> Result<bool>;

    /// Atomically adds one to the record's access count.
    /// Returns `false` if the record no longer exists.
    async fn increment_access_count(&self, record: &UrlRecord) -> Result<bool>;

    /// Removes every record whose `expires_at` is at or before `now`.
    /// Returns the number of records removed.
    async fn delete_expired(&self, now: Timestamp) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;

    fn record(expires_at: Option<Timestamp>) -> UrlRecord {
        UrlRecord {
            id: 1,
            original_url: "https://example.com".to_string(),
            short_code: ShortCode::new_unchecked("abc123"),
            created_at: Timestamp::from_second(0).unwrap(),
            expires_at,
            access_count: 0,
        }
    }

    #[test]
    fn never_expires_without_expiry() {
        assert!(!record(None).is_expired_at(Timestamp::MAX));
    }

    #[test]
    fn expired_at_and_after_boundary() {
        let at = Timestamp::from_second(100).unwrap();
        let rec = record(Some(at));

        assert!(!rec.is_expired_at(at - SignedDuration::from_secs(1)));
        assert!(rec.is_expired_at(at));
        assert!(rec.is_expired_at(at + SignedDuration::from_secs(1)));
    }
}
