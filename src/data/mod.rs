//! Acquisition state and the views derived from it.
//!
//! ## Submodules
//!
//! - [`buffer`]: Bounded rolling [`TimeSeriesBuffer`] of samples
//! - [`disconnect`]: [`DisconnectDetector`] for silent source failure
//! - [`duration`]: Parsing and formatting of durations (e.g., "3s", "500ms")
//! - [`view`]: Pure derivation of chart series, scales and route shares
//!
//! ## Data Flow
//!
//! ```text
//! MetricsReading (sanitized)
//!        │
//!        ▼
//! TimeSeriesBuffer::append() ──▶ DisconnectDetector::on_success()
//!        │
//!        ▼
//! SeriesView::derive() ──▶ DashboardView (UI, export, headless log)
//! ```

pub mod buffer;
pub mod disconnect;
pub mod duration;
pub mod view;

pub use buffer::TimeSeriesBuffer;
pub use disconnect::DisconnectDetector;
pub use view::{DashboardView, Metric, SeriesView};
