use snip_core::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RedirectorError>;

#[derive(Debug, Clone, Error)]
pub enum RedirectorError {
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("short code expired: {0}")]
    Expired(String),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl RedirectorError {
    /// Whether callers should see this as a missing link.
    ///
    /// Expired links are reported exactly like missing ones.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Expired(_))
    }
}
