use crate::Generator;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use snip_core::shortcode::GENERATED_LENGTH;
use snip_core::{Clock, ShortCode, SystemClock};
use std::sync::Arc;

/// Generates codes from a SHA-256 digest of the URL, the attempt counter
/// and a nanosecond timestamp.
///
/// The digest is rendered in URL-safe base64 and truncated to
/// [`GENERATED_LENGTH`] characters, giving 64^6 possible codes.
#[derive(Clone)]
pub struct DigestGenerator {
    clock: Arc<dyn Clock>,
}

impl DigestGenerator {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Salts digests with `clock` instead of the system time.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Default for DigestGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DigestGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestGenerator").finish_non_exhaustive()
    }
}

impl Generator for DigestGenerator {
    fn generate(&self, url: &str, attempt: u32) -> ShortCode {
        let salt = self.clock.now().as_nanosecond();

        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        hasher.update(attempt.to_string().as_bytes());
        hasher.update(salt.to_string().as_bytes());
        let digest = hasher.finalize();

        let mut encoded = URL_SAFE_NO_PAD.encode(digest);
        encoded.truncate(GENERATED_LENGTH);
        ShortCode::new_unchecked(encoded)
    }
}
