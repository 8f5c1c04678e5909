//! Error types for data source fetches.

use std::time::Duration;

use thiserror::Error;

/// Default length of error details shown to users.
pub const DEFAULT_DETAIL_LEN: usize = 120;

/// Errors that can occur when fetching from a data source.
///
/// `Connection` and `Timeout` are transient: the next natural poll retries
/// them. The others are protocol errors: the source answered, but not with
/// something usable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// Could not reach the source.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// No response within the per-call timeout.
    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The source answered with a non-success status.
    #[error("HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    /// The source answered `ok: false`.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The response body was not the expected shape.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The client could not be constructed.
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl FetchError {
    /// Returns true for network-level failures that a later poll may fix.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Connection(_) | FetchError::Timeout(_))
    }

    /// The message shortened to `max` characters for display.
    pub fn detail(&self, max: usize) -> String {
        truncate_detail(&self.to_string(), max)
    }

    /// Build an [`FetchError::Http`] from a status and response body.
    pub fn http(status: u16, body: &str) -> Self {
        let body = body.trim();
        let detail = if body.is_empty() {
            "empty response".to_string()
        } else {
            truncate_detail(body, 200)
        };
        FetchError::Http { status, detail }
    }
}

/// Shorten `text` to at most `max` characters, marking the cut with `…`.
pub fn truncate_detail(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
