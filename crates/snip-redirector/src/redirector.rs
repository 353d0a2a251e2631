use crate::error::Result;
use async_trait::async_trait;
use snip_core::ShortCode;

#[async_trait]
pub trait Redirector: Send + Sync + 'static {
    /// Resolves a short code to its original URL and records the access.
    ///
    /// Fails with `NotFound` if the code does not exist and with `Expired`
    /// if it has expired.
    async fn resolve(&self, code: &ShortCode) -> Result<String>;
}
