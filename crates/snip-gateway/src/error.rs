use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use snip_core::{ShortCodeError, StorageError};
use snip_redirector::RedirectorError;
use snip_shortener::ShortenerError;
use tracing::error;

use crate::model::ErrorResponse;

pub type Result<T> = std::result::Result<T, AppError>;

const NOT_FOUND: &str = "short code not found";

#[derive(Debug)]
pub enum AppError {
    Shortener(ShortenerError),
    Redirector(RedirectorError),
    /// A path segment that cannot be a short code.
    InvalidCode(ShortCodeError),
    /// A request body that is not the expected JSON document.
    InvalidBody(JsonRejection),
    RateLimited,
}

impl From<JsonRejection> for AppError {
    fn from(value: JsonRejection) -> Self {
        Self::InvalidBody(value)
    }
}

impl From<ShortenerError> for AppError {
    fn from(value: ShortenerError) -> Self {
        Self::Shortener(value)
    }
}

impl From<RedirectorError> for AppError {
    fn from(value: RedirectorError) -> Self {
        Self::Redirector(value)
    }
}

impl From<ShortCodeError> for AppError {
    fn from(value: ShortCodeError) -> Self {
        Self::InvalidCode(value)
    }
}

fn storage_status(e: &StorageError) -> StatusCode {
    match e {
        StorageError::Unavailable(_) | StorageError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Shortener(e) => match e {
                ShortenerError::InvalidUrl(_)
                | ShortenerError::SlugTooLong { .. }
                | ShortenerError::InvalidExpiration(_) => (StatusCode::BAD_REQUEST, e.to_string()),
                ShortenerError::SlugConflict(_) => (StatusCode::CONFLICT, e.to_string()),
                ShortenerError::NotFound(_) => (StatusCode::NOT_FOUND, NOT_FOUND.to_string()),
                ShortenerError::CodeSpaceExhausted(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
                }
                ShortenerError::Storage(e) => (storage_status(e), e.to_string()),
            },
            AppError::Redirector(e) if e.is_not_found() => {
                (StatusCode::NOT_FOUND, NOT_FOUND.to_string())
            }
            AppError::Redirector(RedirectorError::Storage(e)) => (storage_status(e), e.to_string()),
            AppError::Redirector(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            // no record can hold a code that does not validate
            AppError::InvalidCode(_) => (StatusCode::NOT_FOUND, NOT_FOUND.to_string()),
            AppError::InvalidBody(rejection) => (rejection.status(), rejection.body_text()),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "too many requests, slow down".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        let message = if status.is_server_error() {
            error!(status = %status, error = %message, "request failed");
            "internal server error".to_string()
        } else {
            message
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
