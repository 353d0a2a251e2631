pub mod digest;

pub use digest::DigestGenerator;

use snip_core::ShortCode;

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage.
/// Uniqueness is not guaranteed; callers retry with a higher `attempt`
/// when a candidate is already taken.
pub trait Generator: Send + Sync + 'static {
    /// Derives a candidate short code for `url`.
    ///
    /// `attempt` counts the candidates already rejected for this URL and
    /// must change the output.
    fn generate(&self, url: &str, attempt: u32) -> ShortCode;
}
