//! REST client for the storefront backend.
//!
//! # Architecture
//!
//! - The backend is the source of truth for accounts, addresses, orders and
//!   signed-in carts; guest state lives in the local store until sign-in
//! - Every endpoint answers with a `{ success, message, ... }` envelope;
//!   [`ApiError::Rejected`] carries the backend's message when `success` is
//!   false
//! - Wire shapes are adapted to the domain models here, so callers never see
//!   `snake_case`/`camelCase` differences
//! - Product lookups are cached in-memory via `moka`
//!
//! # Example
//!
//! ```rust,ignore
//! use bbqstyle_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config)?;
//! client.send_otp(&mobile).await?;
//! let verified = client.verify_otp(&mobile, &code).await?;
//! ```

mod cache;
mod client;
pub mod types;

pub use client::ApiClient;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status and no message.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Backend rejected the request with a message.
    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Building a request URL failed.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The endpoint requires a signed-in customer.
    #[error("not signed in")]
    NotAuthenticated,
}

impl ApiError {
    /// HTTP status associated with this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::Rejected { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the backend reported the resource as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether the backend reported a duplicate.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Whether the bearer token was refused.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::NotAuthenticated) || matches!(self.status(), Some(401 | 403))
    }

    /// Message the backend supplied, if it supplied one.
    #[must_use]
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Common head of every backend response.
#[derive(Debug, Default, Deserialize)]
struct EnvelopeHead {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl EnvelopeHead {
    fn message(self) -> Option<String> {
        let error = self.error.and_then(|e| e.as_str().map(str::to_owned));
        self.message.or(error).filter(|m| !m.trim().is_empty())
    }
}

/// Check status and envelope, then decode the payload.
///
/// Bodies without an envelope (product lookups, review lists) are decoded
/// as-is.
pub(crate) fn decode_body<T>(status: reqwest::StatusCode, body: &str) -> Result<T, ApiError>
where
    T: serde::de::DeserializeOwned,
{
    let head = serde_json::from_str::<EnvelopeHead>(body).unwrap_or_default();
    let code = status.as_u16();

    if !status.is_success() {
        return Err(match head.message() {
            Some(message) => ApiError::Rejected {
                status: code,
                message,
            },
            None => ApiError::Status {
                status: code,
                body: truncate(body, 200),
            },
        });
    }

    if head.success == Some(false) {
        return Err(ApiError::Rejected {
            status: code,
            message: head.message().unwrap_or_else(|| "Request failed".to_string()),
        });
    }

    Ok(serde_json::from_str(body)?)
}

pub(crate) fn truncate(body: &str, max: usize) -> String {
    body.chars().take(max).collect()
}
