//! # routewatch
//!
//! A terminal dashboard and library for watching the live latency, throughput,
//! error rate and routing split of an experiment, next to the verdict of an
//! auxiliary evaluation agent.
//!
//! The interesting part is the acquisition layer underneath the dashboard:
//! it polls a metrics endpoint on a fixed cadence, sanitizes every number at
//! the ingestion boundary, keeps a bounded rolling history, notices when the
//! source goes silent without discarding what it already has, and fetches the
//! agent verdict through a versioned fallback cascade.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Application                         │
//! │  ┌─────────┐    ┌────────────┐    ┌──────────┐    ┌───────┐ │
//! │  │  app    │───▶│ aggregator │───▶│   data   │───▶│  ui   │ │
//! │  │ (state) │    │ (acquire)  │    │ (views)  │    │       │ │
//! │  └─────────┘    └─────┬──────┘    └──────────┘    └───────┘ │
//! │                       │                                      │
//! │                       ▼                                      │
//! │        poll (timer)  +  routewatch_adapters (fetch)          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`aggregator`]**: [`MetricsAggregator`] composes polling, fetching,
//!   buffering, staleness detection and verdict acquisition
//! - **[`poll`]**: Scoped poll timers ([`PollingScheduler`], [`poll::PollHandle`])
//! - **[`data`]**: [`TimeSeriesBuffer`], [`DisconnectDetector`] and the pure
//!   [`DashboardView`] derivation
//! - **[`clock`]**: Injectable time ([`SystemClock`], [`ManualClock`])
//! - **[`config`]**: Layered [`Settings`] (defaults, TOML file, environment)
//! - **[`app`]**, **[`events`]**, **[`ui`]**: The ratatui front end
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Watch two experiments against a local backend
//! routewatch --exp exp-a --exp exp-b
//!
//! # Log one line per poll instead of drawing a TUI
//! routewatch --endpoint http://dash:8000 --exp exp-a --headless
//!
//! # Take one snapshot and write it as JSON
//! routewatch --exp exp-a --export view.json
//! ```
//!
//! ### As a library with a scripted backend
//!
//! ```
//! use std::sync::Arc;
//! use routewatch::{AggregatorConfig, ManualClock, MetricsAggregator, TickOutcome};
//! use routewatch_adapters::{Reply, ScriptedTransport};
//! use routewatch_types::ExperimentId;
//!
//! # tokio_test::block_on(async {
//! let transport = ScriptedTransport::new().on_get(
//!     "/metrics/mini",
//!     Reply::json(200, r#"{"ok":true,"p95":"NaN","qps":4,"err_pct":0,"route_share":{"a":1},"samples":9}"#),
//! );
//! let aggregator = MetricsAggregator::new(
//!     Arc::new(transport),
//!     Arc::new(ManualClock::new(0)),
//!     AggregatorConfig::default(),
//! );
//!
//! aggregator.handle().focus(ExperimentId::new("exp-a"));
//! assert_eq!(aggregator.tick().await, TickOutcome::Appended);
//! assert_eq!(aggregator.view().series.latest.unwrap().p95_ms, 0.0);
//! # });
//! ```

pub mod aggregator;
pub mod app;
pub mod clock;
pub mod config;
pub mod data;
pub mod events;
pub mod logging;
pub mod poll;
pub mod ui;

// Re-export main types for convenience
pub use aggregator::{AggregatorConfig, AggregatorHandle, MetricsAggregator, TickOutcome};
pub use app::App;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Settings;
pub use data::{DashboardView, DisconnectDetector, SeriesView, TimeSeriesBuffer};
pub use poll::PollingScheduler;
