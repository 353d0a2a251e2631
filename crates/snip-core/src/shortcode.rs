use crate::error::ShortCodeError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// An identifier that a long URL is published under.
///
/// Generated codes are always [`GENERATED_LENGTH`] characters long. Custom
/// codes chosen by callers may be up to [`MAX_LENGTH`] characters and carry
/// no alphabet restriction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortCode(String);

/// Maximum length, in characters, of a custom short code.
pub const MAX_LENGTH: usize = 20;

/// Length of a code produced by a generator.
pub const GENERATED_LENGTH: usize = 6;

impl ShortCode {
    /// Creates a new `ShortCode` from caller input after validating its length.
    pub fn new(code: impl Into<String>) -> Result<Self, ShortCodeError> {
        let code = code.into();
        Self::validate(&code)?;
        Ok(Self(code))
    }

    /// Creates a `ShortCode` without validation.
    ///
    /// Use this only for codes produced by trusted internal sources, such as
    /// generators or values read back from the record store.
    pub fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(code: &str) -> Result<(), ShortCodeError> {
        if code.is_empty() {
            return Err(ShortCodeError::Empty);
        }

        let len = code.chars().count();
        if len > MAX_LENGTH {
            return Err(ShortCodeError::TooLong {
                len,
                max: MAX_LENGTH,
            });
        }

        Ok(())
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
