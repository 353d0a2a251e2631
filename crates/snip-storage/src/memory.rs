use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use snip_core::repository::{NewUrlRecord, ReadRepository, Repository, Result, UrlRecord};
use snip_core::{ShortCode, StorageError};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// In-memory implementation of the Repository trait using DashMap.
///
/// DashMap provides better concurrency than RwLock<HashMap> because it
/// uses sharded locks, allowing concurrent reads and writes to different
/// buckets without blocking. The entry API makes insert a single
/// check-and-set, so it enforces code uniqueness the same way a unique
/// index does.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    storage: DashMap<String, UrlRecord>,
    next_id: AtomicU64,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory repository with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: DashMap::with_capacity(capacity),
            next_id: AtomicU64::new(0),
        }
    }

    /// Number of stored records, expired ones included.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

#[async_trait]
impl ReadRepository for InMemoryRepository {
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        Ok(self
            .storage
            .get(code.as_str())
            .map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn insert(&self, record: NewUrlRecord) -> Result<UrlRecord> {
        match self.storage.entry(record.short_code.as_str().to_owned()) {
            Entry::Occupied(_) => Err(StorageError::Conflict(record.short_code.to_string())),
            Entry::Vacant(vacant) => {
                let stored = UrlRecord {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
                    original_url: record.original_url,
                    short_code: record.short_code,
                    created_at: record.created_at,
                    expires_at: record.expires_at,
                    access_count: 0,
                };
                vacant.insert(stored.clone());
                trace!(code = %stored.short_code, id = stored.id, "inserted record");
                Ok(stored)
            }
        }
    }

    async fn delete(&self, record: &UrlRecord) -> Result<bool> {
        Ok(self
            .storage
            .remove_if(record.short_code.as_str(), |_, stored| stored.id == record.id)
            .is_some())
    }

    async fn increment_access_count(&self, record: &UrlRecord) -> Result<bool> {
        match self.storage.get_mut(record.short_code.as_str()) {
            Some(mut stored) if stored.id == record.id => {
                stored.access_count += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_expired(&self, now: Timestamp) -> Result<u64> {
        let mut removed = 0;
        self.storage.retain(|_, record| {
            let expired = record.is_expired_at(now);
            if expired {
                removed += 1;
            }
            !expired
        });
        Ok(removed)
    }
}
