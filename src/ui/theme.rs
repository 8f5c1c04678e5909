//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use routewatch_types::{ConnectionState, Verdict};

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for highlights and active elements.
    pub highlight: Color,
    /// Color for stale data and EDGE verdicts.
    pub warning: Color,
    /// Color for failures and FAIL verdicts.
    pub critical: Color,
    /// Color for a live stream and PASS verdicts.
    pub healthy: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Style for panel titles.
    pub header: Style,
    /// Bar color of route share gauges.
    pub gauge: Color,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            warning: Color::Yellow,
            critical: Color::Red,
            healthy: Color::Green,
            border: Color::Gray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            gauge: Color::Cyan,
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            warning: Color::Yellow,
            critical: Color::Red,
            healthy: Color::Green,
            border: Color::DarkGray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            gauge: Color::Blue,
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Style for the connection indicator.
    pub fn connection_style(&self, state: ConnectionState) -> Style {
        match state {
            ConnectionState::Ok => Style::default().fg(self.healthy),
            ConnectionState::Stale => Style::default().fg(self.warning).add_modifier(Modifier::BOLD),
        }
    }

    /// Style for a verdict badge.
    pub fn verdict_style(&self, verdict: &Verdict) -> Style {
        match verdict {
            Verdict::Pass => Style::default().fg(self.healthy).add_modifier(Modifier::BOLD),
            Verdict::Edge => Style::default().fg(self.warning).add_modifier(Modifier::BOLD),
            Verdict::Fail => Style::default().fg(self.critical).add_modifier(Modifier::BOLD),
            Verdict::Other(_) => Style::default().add_modifier(Modifier::BOLD),
        }
    }

    /// Style for border lines.
    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }
}
