use serde::{Deserialize, Serialize};
use snip_shortener::ShortenParams;

#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    pub url: String,
    #[serde(default)]
    pub custom_slug: Option<String>,
    #[serde(default)]
    pub expiration_days: Option<i64>,
}

impl From<ShortenRequest> for ShortenParams {
    fn from(request: ShortenRequest) -> Self {
        ShortenParams {
            original_url: request.url,
            custom_slug: request.custom_slug,
            expiration_days: request.expiration_days,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub short_url: String,
    pub short_code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
