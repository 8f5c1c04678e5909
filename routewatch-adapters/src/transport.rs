//! The transport seam between clients and the network.
//!
//! Every client receives an `Arc<dyn Transport>` instead of reaching for a
//! global HTTP client, so tests can swap in [`ScriptedTransport`].
//!
//! [`ScriptedTransport`]: crate::ScriptedTransport

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::FetchError;

/// A raw response: status code plus body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Create a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-success status into [`FetchError::Http`].
    pub fn into_success(self) -> Result<Self, FetchError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(FetchError::http(self.status, &self.body))
        }
    }
}

/// Minimal async request interface used by all clients.
///
/// `path` is the path plus query string, e.g. `/agent/summary?v=3`.
/// Implementations return `Ok` for any response that arrived, whatever its
/// status; only failures to obtain a response are errors.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Issue a GET request.
    async fn get(&self, path: &str) -> Result<HttpResponse, FetchError>;

    /// Issue a POST request with an empty body.
    async fn post(&self, path: &str) -> Result<HttpResponse, FetchError>;
}

/// Run `request`, failing with [`FetchError::Timeout`] after `timeout`.
///
/// The request future is dropped on timeout, cancelling it.
pub async fn with_timeout<F>(timeout: Duration, request: F) -> Result<HttpResponse, FetchError>
where
    F: Future<Output = Result<HttpResponse, FetchError>>,
{
    tokio::time::timeout(timeout, request)
        .await
        .map_err(|_| FetchError::Timeout(timeout))?
}

/// Percent-encode a query component.
pub fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
