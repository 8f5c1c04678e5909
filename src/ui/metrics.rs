//! Metrics panel rendering.
//!
//! Latest p95/qps/error values with sparkline trends, followed by one gauge
//! per route showing its share of traffic.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::view::{Metric, SeriesView};
use crate::ui::common::sparkline;

/// Width of the sparkline trend, in samples.
const TREND_WIDTH: usize = 40;

/// Render latest values, trends and route shares.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let series = &app.view.series;
    let routes = series.routes.len() as u16;

    let chunks = Layout::vertical([
        Constraint::Length(5),               // Latest values + trends
        Constraint::Min(routes.max(1) + 2), // Route shares
    ])
    .split(area);

    render_trends(frame, app, series, chunks[0]);
    render_routes(frame, app, series, chunks[1]);
}

fn render_trends(frame: &mut Frame, app: &App, series: &SeriesView, area: Rect) {
    let block = Block::default()
        .title(Span::styled(format!(" Metrics ({} samples) ", series.samples), app.theme.header))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(app.theme.border_style());

    let Some(latest) = &series.latest else {
        let waiting = Paragraph::new(" Waiting for first sample…")
            .style(Style::default().add_modifier(Modifier::DIM))
            .block(block);
        frame.render_widget(waiting, area);
        return;
    };

    let width = usize::from(area.width.saturating_sub(30)).min(TREND_WIDTH);
    let row = |metric: Metric, value: String, max: f64| {
        let values: Vec<f64> = series.points(metric).iter().map(|(_, v)| *v).collect();
        Line::from(vec![
            Span::styled(format!(" {:<11}", metric.label()), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!("{value:>9}  ")),
            Span::styled(sparkline(&values, width), Style::default().fg(app.theme.highlight)),
            Span::styled(format!("  max {max}"), Style::default().add_modifier(Modifier::DIM)),
        ])
    };

    let lines = vec![
        row(Metric::P95, format!("{:.1}", latest.p95_ms), series.scale.p95_max),
        row(Metric::Qps, format!("{:.1}", latest.qps), series.scale.qps_max),
        row(Metric::ErrPct, format!("{:.2}", latest.err_pct), series.scale.err_max),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_routes(frame: &mut Frame, app: &App, series: &SeriesView, area: Rect) {
    let block = Block::default()
        .title(Span::styled(" Route share ", app.theme.header))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(app.theme.border_style());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if series.routes.is_empty() {
        let empty = Paragraph::new(" No routing data").style(Style::default().add_modifier(Modifier::DIM));
        frame.render_widget(empty, inner);
        return;
    }

    let rows = Layout::vertical(series.routes.iter().map(|_| Constraint::Length(1))).split(inner);
    for (route, row) in series.routes.iter().zip(rows.iter()) {
        let ratio = (route.percent / 100.0).clamp(0.0, 1.0);
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(app.theme.gauge))
            .ratio(ratio)
            .label(format!("{} {:.1}%", route.name, route.percent));
        frame.render_widget(gauge, *row);
    }
}
