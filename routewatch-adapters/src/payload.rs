//! Wire payloads of the dashboard API.
//!
//! Raw responses are deserialized into loosely-typed payload structs and
//! then sanitized into routewatch types. Numeric fields go through
//! [`safe_number`](crate::safe_number) one by one.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use routewatch_types::{AgentVerdict, ProtocolVersion, Sample, Verdict};

use crate::safe_number::{sanitize, sanitize_count};
use crate::FetchError;

/// Sanitized body of a `/metrics/mini` response with at least one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsReading {
    pub p95_ms: f64,
    pub qps: f64,
    pub err_pct: f64,
    pub route_share: BTreeMap<String, f64>,
    /// Number of raw requests aggregated into this reading.
    pub samples: u64,
}

impl MetricsReading {
    /// Stamp the reading with its arrival time.
    pub fn into_sample(self, timestamp_ms: u64) -> Sample {
        Sample {
            timestamp_ms,
            p95_ms: self.p95_ms,
            qps: self.qps,
            err_pct: self.err_pct,
            route_share: self.route_share,
        }
    }
}

/// Outcome of a successful `/metrics/mini` fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricsWindow {
    /// The window held no samples. Not an error.
    Empty,
    /// The window held at least one sample.
    Reading(MetricsReading),
}

#[derive(Debug, Deserialize)]
struct MiniMetricsPayload {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    p95: Value,
    #[serde(default)]
    qps: Value,
    #[serde(default)]
    err_pct: Value,
    #[serde(default)]
    route_share: Value,
    #[serde(default)]
    samples: Value,
}

#[derive(Debug, Deserialize)]
struct AgentSummaryPayload {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    verdict: Option<String>,
    #[serde(default)]
    bullets: Option<Vec<Value>>,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    explainer_mode: Option<String>,
    #[serde(default)]
    cached: Option<bool>,
    #[serde(default)]
    generated_at: Option<Value>,
}

/// Parse a `/metrics/mini` body.
pub fn parse_metrics(body: &str) -> Result<MetricsWindow, FetchError> {
    let payload: MiniMetricsPayload =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    if !payload.ok {
        return Err(FetchError::Rejected(rejection_message(payload.error.as_ref())));
    }

    let samples = sanitize_count(&payload.samples);
    if samples == 0 {
        return Ok(MetricsWindow::Empty);
    }

    Ok(MetricsWindow::Reading(MetricsReading {
        p95_ms: sanitize(&payload.p95),
        qps: sanitize(&payload.qps),
        err_pct: sanitize(&payload.err_pct),
        route_share: route_shares(&payload.route_share),
        samples,
    }))
}

/// Parse an `/agent/summary` body obtained at `version`.
pub fn parse_agent_summary(
    body: &str,
    version: ProtocolVersion,
    requested: ProtocolVersion,
) -> Result<AgentVerdict, FetchError> {
    let payload: AgentSummaryPayload =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    if !payload.ok {
        return Err(FetchError::Rejected(rejection_message(payload.error.as_ref())));
    }

    let verdict = payload
        .verdict
        .as_deref()
        .map(Verdict::parse)
        .ok_or_else(|| FetchError::Parse("missing verdict".to_string()))?;

    Ok(AgentVerdict {
        verdict,
        bullets: payload.bullets.unwrap_or_default().iter().map(value_text).collect(),
        mode: payload.mode.or(payload.explainer_mode),
        cached: payload.cached,
        generated_at: payload.generated_at.as_ref().map(value_text),
        version,
        requested,
    })
}

fn route_shares(raw: &Value) -> BTreeMap<String, f64> {
    match raw {
        Value::Object(map) => map.iter().map(|(name, share)| (name.clone(), sanitize(share))).collect(),
        _ => BTreeMap::new(),
    }
}

fn rejection_message(error: Option<&Value>) -> String {
    match error {
        Some(Value::Null) | None => "source reported ok=false".to_string(),
        Some(value) => value_text(value),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
