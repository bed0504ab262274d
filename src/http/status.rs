//! Classification of non-success HTTP responses.
//!
//! Requests are never retried; a failed status is turned into an [`HttpError`]
//! so callers can tell a missing resource from a rejected credential.

use reqwest::{Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;

/// A non-success response from the hosting service.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HttpError {
    /// HTTP 401
    #[error("Authentication failed: {0}. Check your HOST_TOKEN.")]
    AuthenticationFailed(String),
    /// HTTP 403
    #[error("Access forbidden: {0}. The token may lack the required scope.")]
    Forbidden(String),
    /// HTTP 404
    #[error("Not found: {0}")]
    NotFound(String),
    /// HTTP 429
    #[error("Rate limit exceeded: {0}. Try again later.")]
    RateLimited(String),
    /// Other 4xx
    #[error("Request rejected (HTTP {status}): {message}")]
    ClientError { status: u16, message: String },
    /// 5xx
    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },
}

impl HttpError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, HttpError::NotFound(_))
    }
}

/// Bitbucket error envelope: `{"type": "error", "error": {"message": "..."}}`.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Maps a non-success status to an [`HttpError`].
///
/// `body` is the raw response body; when it carries an error envelope its
/// message is used, otherwise a generic description of the status.
pub fn classify_status(status: StatusCode, body: &str) -> HttpError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .ok()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });

    match status {
        StatusCode::UNAUTHORIZED => HttpError::AuthenticationFailed(message),
        StatusCode::FORBIDDEN => HttpError::Forbidden(message),
        StatusCode::NOT_FOUND => HttpError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => HttpError::RateLimited(message),
        s if s.is_server_error() => HttpError::ServerError {
            status: s.as_u16(),
            message,
        },
        s => HttpError::ClientError {
            status: s.as_u16(),
            message,
        },
    }
}

/// Passes a successful response through, or consumes a failed one into an
/// [`HttpError`] wrapped in `anyhow` so it can be downcast later.
pub async fn check_status(response: Response) -> anyhow::Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(anyhow::Error::from(classify_status(status, &body)))
}
