//! Client for the `/metrics/mini` endpoint.

use std::sync::Arc;
use std::time::Duration;

use routewatch_types::ExperimentId;

use crate::payload::{parse_metrics, MetricsWindow};
use crate::transport::{encode_component, with_timeout};
use crate::{FetchError, Transport};

/// Default per-call timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(3_000);

/// Default aggregation window requested from the backend.
pub const DEFAULT_WINDOW_SEC: u64 = 60;

/// Fetches one aggregated metrics window per call.
#[derive(Debug, Clone)]
pub struct MetricsClient {
    transport: Arc<dyn Transport>,
    timeout: Duration,
    window_sec: u64,
}

impl MetricsClient {
    /// Create a client with the default timeout and window.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            timeout: DEFAULT_FETCH_TIMEOUT,
            window_sec: DEFAULT_WINDOW_SEC,
        }
    }

    /// Set the per-call timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the aggregation window in seconds.
    pub fn window_sec(mut self, window_sec: u64) -> Self {
        self.window_sec = window_sec;
        self
    }

    /// Request path for `experiment`.
    pub fn path(&self, experiment: &ExperimentId) -> String {
        format!(
            "/metrics/mini?exp_id={}&window_sec={}",
            encode_component(experiment.as_str()),
            self.window_sec
        )
    }

    /// Fetch the current window for `experiment`.
    ///
    /// The request is cancelled once the per-call timeout elapses.
    pub async fn fetch(&self, experiment: &ExperimentId) -> Result<MetricsWindow, FetchError> {
        let path = self.path(experiment);
        let response = with_timeout(self.timeout, self.transport.get(&path)).await?;
        parse_metrics(&response.into_success()?.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Reply, ScriptedTransport};

    const BODY: &str =
        r#"{"ok":true,"p95":88.5,"qps":12,"err_pct":0.5,"route_share":{"a":0.6,"b":0.4},"samples":40}"#;

    #[test]
    fn path_encodes_experiment() {
        let client = MetricsClient::new(Arc::new(ScriptedTransport::new())).window_sec(30);
        assert_eq!(
            client.path(&ExperimentId::new("exp 7")),
            "/metrics/mini?exp_id=exp%207&window_sec=30"
        );
    }

    #[tokio::test]
    async fn fetch_reading() {
        let transport = ScriptedTransport::new().on_get("/metrics/mini", Reply::json(200, BODY));
        let client = MetricsClient::new(Arc::new(transport));
        let MetricsWindow::Reading(reading) = client.fetch(&"exp".into()).await.unwrap() else {
            panic!("expected a reading");
        };
        assert_eq!(reading.p95_ms, 88.5);
        assert_eq!(reading.samples, 40);
    }

    #[tokio::test]
    async fn non_success_status_is_http_error() {
        let transport = ScriptedTransport::new().on_get("/metrics/mini", Reply::json(502, "bad gateway"));
        let client = MetricsClient::new(Arc::new(transport));
        let err = client.fetch(&"exp".into()).await.unwrap_err();
        assert_eq!(
            err,
            FetchError::Http {
                status: 502,
                detail: "bad gateway".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out() {
        let transport = ScriptedTransport::new().on_get(
            "/metrics/mini",
            Reply::json(200, BODY).after(Duration::from_secs(5)),
        );
        let client = MetricsClient::new(Arc::new(transport));
        let err = client.fetch(&"exp".into()).await.unwrap_err();
        assert_eq!(err, FetchError::Timeout(DEFAULT_FETCH_TIMEOUT));
        assert!(err.is_transient());
    }
}
