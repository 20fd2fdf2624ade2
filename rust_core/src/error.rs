//! Error taxonomy for the provider and channel boundaries.

use std::time::Duration;
use thiserror::Error;

/// Snapshot fetch failure, surfaced only after the retry policy is exhausted
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("data provider rate limited the request (HTTP 429)")]
    RateLimited,

    #[error("data provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode provider payload: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Decode(e.to_string())
    }
}

/// Outbound notification failure
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Channel asked us to slow down; safe to retry after the given delay
    #[error("channel rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// Network hiccup or 5xx
    #[error("transient dispatch failure: {0}")]
    Transient(String),

    /// Invalid destination or credential; retrying will not help
    #[error("permanent dispatch failure: {0}")]
    Permanent(String),
}

impl DispatchError {
    pub fn is_transient(&self) -> bool {
        !matches!(self, DispatchError::Permanent(_))
    }
}

impl From<reqwest::Error> for DispatchError {
    fn from(e: reqwest::Error) -> Self {
        DispatchError::Transient(e.to_string())
    }
}
