//! Common UI components.
//!
//! This module contains the header bar, status bar, help overlay and the
//! sparkline renderer shared by the panels.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::duration::format_age;
use crate::data::view::sparkline_levels;

/// Sparkline characters (8 levels of height).
const SPARKLINE_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Render the header bar with the experiment and connection state.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let view = &app.view;
    let experiment = view
        .experiment
        .as_ref()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no experiment".to_string());

    let position = if app.experiments.len() > 1 {
        format!(" ({}/{})", app.selected + 1, app.experiments.len())
    } else {
        String::new()
    };

    let line = Line::from(vec![
        Span::styled(" ● ", app.theme.connection_style(view.connection)),
        Span::styled("ROUTEWATCH ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(experiment, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(position),
        Span::raw(" │ "),
        Span::styled(
            view.connection.label().to_uppercase(),
            app.theme.connection_style(view.connection),
        ),
        Span::raw(format!(" │ last sample {} ago │ ", format_age(view.silence_ms))),
        Span::styled(app.endpoint.clone(), Style::default().add_modifier(Modifier::DIM)),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the status bar at the bottom.
///
/// A temporary message wins, then the metrics status, then the agent
/// status, then the key hints.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let view = &app.view;
    let (text, style) = if !view.metrics_status.is_empty() {
        (view.metrics_status.as_str(), Style::default().fg(app.theme.warning))
    } else if !view.agent_status.is_empty() {
        (view.agent_status.as_str(), Style::default().fg(app.theme.warning))
    } else {
        (
            "n/p:experiment r:refresh x:run d:dry-run e:export ?:help q:quit",
            Style::default().add_modifier(Modifier::DIM),
        )
    };

    frame.render_widget(Paragraph::new(format!(" {text}")).style(style), area);
}

/// Render the help overlay with keyboard shortcuts.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let section = |title: &'static str| {
        Line::from(vec![Span::styled(title, Style::default().add_modifier(Modifier::BOLD))])
    };

    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        section(" Experiments"),
        Line::from("  n / →     Next experiment"),
        Line::from("  p / ←     Previous experiment"),
        Line::from(""),
        section(" Agent"),
        Line::from("  r         Refresh verdict"),
        Line::from("  x         Run agent"),
        Line::from("  d         Dry run"),
        Line::from(""),
        section(" General"),
        Line::from("  e         Export view to JSON"),
        Line::from("  q         Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    let help_width = 40u16.min(area.width.saturating_sub(4));
    let help_height = 19u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    frame.render_widget(Clear, help_area);
    frame.render_widget(paragraph, help_area);
}

/// The last `width` values as sparkline characters.
pub fn sparkline(values: &[f64], width: usize) -> String {
    let start = values.len().saturating_sub(width);
    sparkline_levels(&values[start..])
        .into_iter()
        .map(|level| SPARKLINE_CHARS[usize::from(level.min(7))])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparkline_keeps_most_recent_values() {
        let values = [5.0, 0.0, 7.0, 14.0];
        assert_eq!(sparkline(&values, 3), "▁▅█");
        assert_eq!(sparkline(&[], 8), "");
        assert_eq!(sparkline(&[2.0, 2.0], 8), "▁▁");
    }
}
