use async_trait::async_trait;
use jiff::Timestamp;
use snip_core::repository::{NewUrlRecord, ReadRepository, Repository, Result, UrlRecord};
use snip_core::{ShortCode, StorageError};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tracing::{debug, info};

/// Schema applied by [`MySqlRepository::ensure_schema`].
pub const SCHEMA: &str = include_str!("../ddl/mysql/short_urls.sql");

/// MySQL implementation of the repository contract.
///
/// Records are hard-deleted, so a code becomes available again once its
/// record is gone. The unique index on `short_code` is what arbitrates
/// concurrent inserts of the same code.
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    /// Creates a repository from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a repository by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the `short_urls` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        info!("mysql schema is up to date");
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn parse_timestamp(column: &str, seconds: i64) -> Result<Timestamp> {
    Timestamp::from_second(seconds).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{seconds}': {e}"))
    })
}

fn row_to_record(row: &MySqlRow) -> Result<UrlRecord> {
    let id: u64 = row.try_get("id").map_err(map_sqlx_error)?;
    let short_code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let original_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let expires_at: Option<i64> = row.try_get("expires_at").map_err(map_sqlx_error)?;
    let access_count: u64 = row.try_get("access_count").map_err(map_sqlx_error)?;

    Ok(UrlRecord {
        id,
        original_url,
        short_code: ShortCode::new_unchecked(short_code),
        created_at: parse_timestamp("created_at", created_at)?,
        expires_at: expires_at
            .map(|value| parse_timestamp("expires_at", value))
            .transpose()?,
        access_count,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl ReadRepository for MySqlRepository {
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, short_code, original_url, created_at, expires_at, access_count
            FROM short_urls
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_record).transpose()
    }
}

#[async_trait]
impl Repository for MySqlRepository {
    async fn insert(&self, record: NewUrlRecord) -> Result<UrlRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO short_urls (short_code, original_url, created_at, expires_at, access_count)
            VALUES (?, ?, ?, ?, 0)
            "#,
        )
        .bind(record.short_code.as_str())
        .bind(record.original_url.as_str())
        .bind(record.created_at.as_second())
        .bind(record.expires_at.map(|ts| ts.as_second()))
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => {
                debug!(code = %record.short_code, id = done.last_insert_id(), "inserted record");
                Ok(UrlRecord {
                    id: done.last_insert_id(),
                    original_url: record.original_url,
                    short_code: record.short_code,
                    created_at: record.created_at,
                    expires_at: record.expires_at,
                    access_count: 0,
                })
            }
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(record.short_code.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn delete(&self, record: &UrlRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM short_urls
            WHERE id = ?
              AND short_code = ?
            "#,
        )
        .bind(record.id)
        .bind(record.short_code.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_access_count(&self, record: &UrlRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE short_urls
            SET access_count = access_count + 1
            WHERE id = ?
              AND short_code = ?
            "#,
        )
        .bind(record.id)
        .bind(record.short_code.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired(&self, now: Timestamp) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM short_urls
            WHERE expires_at IS NOT NULL
              AND expires_at <= ?
            "#,
        )
        .bind(now.as_second())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}
