//! Terminal UI rendering using ratatui.
//!
//! Every panel renders from `App::view`, the [`DashboardView`] snapshot
//! taken once per frame, so a frame never mixes two acquisition states.
//!
//! ## Submodules
//!
//! - [`metrics`]: Latest values, sparkline trends and route share gauges
//! - [`agent`]: Verdict badge with version provenance and bullets
//! - [`common`]: Shared components (header, status bar, help overlay)
//! - [`theme`]: Light/dark theme support with terminal auto-detection
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Header (common::render_header)       │
//! ├───────────────────────┬──────────────┤
//! │                       │              │
//! │ metrics::render       │ agent::render│
//! │                       │              │
//! ├───────────────────────┴──────────────┤
//! │ Status Bar (common::render_status)   │
//! └──────────────────────────────────────┘
//!         ↑
//!    Overlay rendered on top:
//!    - common::render_help
//! ```
//!
//! [`DashboardView`]: crate::data::DashboardView

pub mod agent;
pub mod common;
pub mod metrics;
pub mod theme;

use ratatui::{
    layout::{Constraint, Layout},
    Frame,
};

use crate::app::App;

pub use theme::Theme;

/// Render one full frame.
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let rows = Layout::vertical([
        Constraint::Length(1), // Header bar
        Constraint::Min(8),    // Panels
        Constraint::Length(1), // Status bar
    ])
    .split(area);

    let panels = Layout::horizontal([Constraint::Percentage(62), Constraint::Percentage(38)]).split(rows[1]);

    common::render_header(frame, app, rows[0]);
    metrics::render(frame, app, panels[0]);
    agent::render(frame, app, panels[1]);
    common::render_status_bar(frame, app, rows[2]);

    if app.show_help {
        common::render_help(frame, app, area);
    }
}
