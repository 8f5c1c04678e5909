//! Client for the agent summary and run endpoints.
//!
//! Both endpoints are versioned; requests go through the
//! [`VersionedSourceClient`] cascade so a failing v3 backend is answered by
//! v2 transparently, with the answering version recorded.

use std::sync::Arc;
use std::time::Duration;

use routewatch_types::{AgentVerdict, ProtocolVersion};

use crate::metrics::DEFAULT_FETCH_TIMEOUT;
use crate::payload::parse_agent_summary;
use crate::transport::with_timeout;
use crate::{FetchError, Transport, Versioned, VersionedSourceClient};

/// Agent summary and run-trigger client.
#[derive(Debug, Clone)]
pub struct AgentClient {
    transport: Arc<dyn Transport>,
    versions: VersionedSourceClient,
    timeout: Duration,
}

impl AgentClient {
    /// Create a client over the default version list (v3, v2).
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            versions: VersionedSourceClient::default(),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Use a different version list.
    pub fn versions(mut self, versions: VersionedSourceClient) -> Self {
        self.versions = versions;
        self
    }

    /// Set the per-call timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch the latest verdict, preferring `preferred`.
    pub async fn summary(&self, preferred: ProtocolVersion) -> Result<AgentVerdict, FetchError> {
        self.summary_versioned(preferred).await.map(|v| v.value)
    }

    /// Fetch the latest verdict along with the fallback record.
    pub async fn summary_versioned(
        &self,
        preferred: ProtocolVersion,
    ) -> Result<Versioned<AgentVerdict>, FetchError> {
        self.versions
            .fetch_versioned(preferred, |version| self.summary_at(version, preferred))
            .await
    }

    /// Ask the agent to recompute its verdict.
    ///
    /// Only the status matters; the body is ignored. Returns the version that
    /// accepted the run.
    pub async fn run(&self, preferred: ProtocolVersion, dry: bool) -> Result<ProtocolVersion, FetchError> {
        let accepted = self
            .versions
            .fetch_versioned(preferred, |version| self.run_at(version, dry))
            .await?;
        Ok(accepted.version)
    }

    async fn summary_at(
        &self,
        version: ProtocolVersion,
        requested: ProtocolVersion,
    ) -> Result<AgentVerdict, FetchError> {
        let path = format!("/agent/summary?v={}", version.number());
        let response = with_timeout(self.timeout, self.transport.get(&path)).await?;
        parse_agent_summary(&response.into_success()?.body, version, requested)
    }

    async fn run_at(&self, version: ProtocolVersion, dry: bool) -> Result<(), FetchError> {
        let path = format!("/agent/run?v={}&dry={}", version.number(), dry);
        with_timeout(self.timeout, self.transport.post(&path))
            .await?
            .into_success()
            .map(|_| ())
    }
}
