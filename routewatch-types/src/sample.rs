//! Metrics samples and derived connection state.

use std::collections::BTreeMap;

/// One timestamped observation of the serving system.
///
/// All numeric fields are expected to be finite. The ingestion boundary
/// sanitizes raw payloads before a `Sample` is ever built from them.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    /// Arrival time in milliseconds on the acquisition clock.
    pub timestamp_ms: u64,

    /// 95th percentile latency in milliseconds.
    pub p95_ms: f64,

    /// Requests per second.
    pub qps: f64,

    /// Error percentage (0-100).
    pub err_pct: f64,

    /// Fraction of traffic served by each named destination.
    ///
    /// Shares need not sum to 1 when destinations report independently.
    pub route_share: BTreeMap<String, f64>,
}

impl Sample {
    /// Create an all-zero sample stamped with `timestamp_ms`.
    pub fn new(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            ..Default::default()
        }
    }

    /// Set the p95 latency.
    pub fn p95(mut self, p95_ms: f64) -> Self {
        self.p95_ms = p95_ms;
        self
    }

    /// Set the request rate.
    pub fn qps(mut self, qps: f64) -> Self {
        self.qps = qps;
        self
    }

    /// Set the error percentage.
    pub fn err_pct(mut self, err_pct: f64) -> Self {
        self.err_pct = err_pct;
        self
    }

    /// Add or replace the share of one destination.
    pub fn route(mut self, name: impl Into<String>, share: f64) -> Self {
        self.route_share.insert(name.into(), share);
        self
    }

    /// Check that every numeric field is finite.
    pub fn is_finite(&self) -> bool {
        self.p95_ms.is_finite()
            && self.qps.is_finite()
            && self.err_pct.is_finite()
            && self.route_share.values().all(|v| v.is_finite())
    }
}

/// Freshness of the metrics stream.
///
/// Derived from the time since the last successful sample; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ConnectionState {
    /// A sample arrived within the disconnect threshold.
    #[default]
    Ok,
    /// No sample within the threshold; history is still shown.
    Stale,
}

impl ConnectionState {
    /// Returns true for [`ConnectionState::Stale`].
    pub fn is_stale(self) -> bool {
        matches!(self, ConnectionState::Stale)
    }

    /// Short lowercase label.
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Ok => "ok",
            ConnectionState::Stale => "stale",
        }
    }
}
