use snip_core::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShortenerError>;

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("custom slug is {len} characters, at most {max} are allowed")]
    SlugTooLong { len: usize, max: usize },
    #[error("custom slug already in use: {0}")]
    SlugConflict(String),
    #[error("expiration must be between 1 and the largest supported number of days, got {0}")]
    InvalidExpiration(i64),
    #[error("no free short code after {0} attempts")]
    CodeSpaceExhausted(u32),
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
