use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use snip_core::ShortCode;

/// Input of a shortening request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShortenParams {
    /// The original URL to be shortened.
    pub original_url: String,
    /// Optional caller-chosen code. An empty slug counts as absent.
    pub custom_slug: Option<String>,
    /// Days until the link expires. `None` means it never expires.
    pub expiration_days: Option<i64>,
}

impl ShortenParams {
    pub fn new(original_url: impl Into<String>) -> Self {
        Self {
            original_url: original_url.into(),
            ..Default::default()
        }
    }

    pub fn with_custom_slug(mut self, slug: impl Into<String>) -> Self {
        self.custom_slug = Some(slug.into());
        self
    }

    pub fn with_expiration_days(mut self, days: i64) -> Self {
        self.expiration_days = Some(days);
        self
    }
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Shortens a given URL based on the provided parameters and returns the short code.
    async fn shorten(&self, params: ShortenParams) -> Result<ShortCode>;

    /// Removes the link published under `code`.
    ///
    /// Returns `false` if no record holds the code.
    async fn delete(&self, code: &ShortCode) -> Result<bool>;
}
