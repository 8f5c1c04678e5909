//! reqwest-backed transport for the dashboard API.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use routewatch_adapters::{HttpTransport, MetricsClient};
//! use routewatch_types::ExperimentId;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = HttpTransport::builder()
//!         .endpoint("http://localhost:8000")
//!         .build()?;
//!
//!     let metrics = MetricsClient::new(Arc::new(transport));
//!     let window = metrics.fetch(&ExperimentId::new("exp-1")).await?;
//!     println!("{:?}", window);
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};

use crate::{FetchError, HttpResponse, Transport};

/// HTTP transport rooted at a base endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a new builder for configuring the transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// The base endpoint requests are made against.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            err.into()
        }
    }

    async fn read(&self, response: Response) -> Result<HttpResponse, FetchError> {
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.error(e))?;
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> Result<HttpResponse, FetchError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| self.error(e))?;
        self.read(response).await
    }

    async fn post(&self, path: &str) -> Result<HttpResponse, FetchError> {
        let response = self
            .client
            .post(self.url(path))
            .send()
            .await
            .map_err(|e| self.error(e))?;
        self.read(response).await
    }
}

/// Builder for HttpTransport.
#[derive(Debug, Default)]
pub struct HttpTransportBuilder {
    endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl HttpTransportBuilder {
    /// Set the API endpoint (e.g., "http://localhost:8000").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the client-level timeout (default: 10 seconds).
    ///
    /// Clients apply their own, shorter per-call timeouts on top of this.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<HttpTransport, FetchError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Config(e.to_string()))?;

        let endpoint = self
            .endpoint
            .unwrap_or_else(|| "http://localhost:8000".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(HttpTransport {
            client,
            endpoint,
            timeout,
        })
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(Duration::ZERO)
        } else if err.is_connect() {
            FetchError::Connection(err.to_string())
        } else if err.is_decode() || err.is_body() {
            FetchError::Parse(err.to_string())
        } else {
            FetchError::Connection(err.to_string())
        }
    }
}
