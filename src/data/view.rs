//! View model derived from the acquisition state.
//!
//! Everything here is a pure function of its inputs. The same buffer always
//! yields the same view; nothing is cached between calls.

use serde::Serialize;

use routewatch_types::{AgentVerdict, ConnectionState, ExperimentId, Sample};

use super::buffer::TimeSeriesBuffer;

/// Number of distinct sparkline levels.
pub const SPARKLINE_LEVELS: u8 = 8;

/// A plotted metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    P95,
    Qps,
    ErrPct,
}

impl Metric {
    /// Read this metric from a sample.
    pub fn value(self, sample: &Sample) -> f64 {
        match self {
            Metric::P95 => sample.p95_ms,
            Metric::Qps => sample.qps,
            Metric::ErrPct => sample.err_pct,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::P95 => "p95 (ms)",
            Metric::Qps => "qps",
            Metric::ErrPct => "errors (%)",
        }
    }
}

/// The newest sample's headline numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestPoint {
    pub timestamp_ms: u64,
    pub p95_ms: f64,
    pub qps: f64,
    pub err_pct: f64,
}

/// Share of traffic for one destination, in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteShare {
    pub name: String,
    pub percent: f64,
}

/// Upper bounds for chart axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartScale {
    pub p95_max: f64,
    pub qps_max: f64,
    pub err_max: f64,
}

/// Chart-ready projection of a [`TimeSeriesBuffer`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesView {
    pub samples: usize,
    pub latest: Option<LatestPoint>,
    pub routes: Vec<RouteShare>,
    pub scale: ChartScale,
    /// `(seconds since first sample, value)` pairs, oldest first.
    pub p95: Vec<(f64, f64)>,
    pub qps: Vec<(f64, f64)>,
    pub err_pct: Vec<(f64, f64)>,
}

impl SeriesView {
    /// Derive the view from the buffer's current contents.
    pub fn derive(buffer: &TimeSeriesBuffer) -> Self {
        Self {
            samples: buffer.len(),
            latest: buffer.latest().map(latest_point),
            routes: buffer.latest().map(route_percentages).unwrap_or_default(),
            scale: ChartScale {
                p95_max: nice_max(buffer.series().map(|s| s.p95_ms)),
                qps_max: nice_max(buffer.series().map(|s| s.qps)),
                err_max: nice_max(buffer.series().map(|s| s.err_pct)),
            },
            p95: series(buffer, Metric::P95),
            qps: series(buffer, Metric::Qps),
            err_pct: series(buffer, Metric::ErrPct),
        }
    }

    /// Points for `metric`.
    pub fn points(&self, metric: Metric) -> &[(f64, f64)] {
        match metric {
            Metric::P95 => &self.p95,
            Metric::Qps => &self.qps,
            Metric::ErrPct => &self.err_pct,
        }
    }
}

/// Everything the presentation layer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub experiment: Option<ExperimentId>,
    pub connection: ConnectionState,
    /// Milliseconds since the last successful sample.
    pub silence_ms: u64,
    /// Rolling metrics status; empty when healthy.
    pub metrics_status: String,
    /// Rolling agent status; empty when healthy.
    pub agent_status: String,
    pub verdict: Option<AgentVerdict>,
    pub series: SeriesView,
}

/// Headline numbers of `sample`.
pub fn latest_point(sample: &Sample) -> LatestPoint {
    LatestPoint {
        timestamp_ms: sample.timestamp_ms,
        p95_ms: sample.p95_ms,
        qps: sample.qps,
        err_pct: sample.err_pct,
    }
}

/// Route shares of `sample` as percentages, ordered by name.
pub fn route_percentages(sample: &Sample) -> Vec<RouteShare> {
    sample
        .route_share
        .iter()
        .map(|(name, share)| RouteShare {
            name: name.clone(),
            percent: share * 100.0,
        })
        .collect()
}

/// `(seconds since first sample, value)` for `metric`.
pub fn series(buffer: &TimeSeriesBuffer, metric: Metric) -> Vec<(f64, f64)> {
    let Some(origin) = buffer.series().next().map(|s| s.timestamp_ms) else {
        return Vec::new();
    };
    buffer
        .series()
        .map(|s| {
            let x = s.timestamp_ms.saturating_sub(origin) as f64 / 1_000.0;
            (x, metric.value(s))
        })
        .collect()
}

/// Axis maximum: the largest value plus 10% headroom, rounded up, at least 1.
pub fn nice_max(values: impl IntoIterator<Item = f64>) -> f64 {
    let max = values.into_iter().fold(0.0_f64, f64::max);
    (max + max / 10.0).ceil().max(1.0)
}

/// Scale `values` to sparkline levels `0..SPARKLINE_LEVELS`.
///
/// The lowest value maps to 0 and the highest to the top level. A flat
/// series sits at the bottom.
pub fn sparkline_levels(values: &[f64]) -> Vec<u8> {
    let Some(first) = values.first() else {
        return Vec::new();
    };
    let (min, max) = values
        .iter()
        .fold((*first, *first), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    let range = max - min;
    let top = f64::from(SPARKLINE_LEVELS - 1);

    values
        .iter()
        .map(|v| {
            if range <= 0.0 {
                0
            } else {
                (((v - min) / range) * top).round().min(top) as u8
            }
        })
        .collect()
}
