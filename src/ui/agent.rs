//! Agent verdict panel.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::App;

/// Render the verdict badge, its provenance and the explanatory bullets.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(Span::styled(" Agent verdict ", app.theme.header))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(app.theme.border_style());

    let Some(verdict) = &app.view.verdict else {
        let waiting = Paragraph::new(" No verdict yet (r to refresh)")
            .style(Style::default().add_modifier(Modifier::DIM))
            .block(block);
        frame.render_widget(waiting, area);
        return;
    };

    let mut provenance = format!("served by {}", verdict.version);
    if verdict.is_fallback() {
        provenance.push_str(&format!(" (fallback from {})", verdict.requested));
    }
    if let Some(mode) = &verdict.mode {
        provenance.push_str(&format!(" · {mode}"));
    }
    if verdict.cached == Some(true) {
        provenance.push_str(" · cached");
    }

    let mut lines = vec![
        Line::from(vec![
            Span::raw(" "),
            Span::styled(format!(" {} ", verdict.verdict), app.theme.verdict_style(&verdict.verdict)),
            Span::raw("  "),
            Span::styled(provenance, Style::default().add_modifier(Modifier::DIM)),
        ]),
    ];
    if let Some(generated_at) = &verdict.generated_at {
        lines.push(Line::from(Span::styled(
            format!(" generated {generated_at}"),
            Style::default().add_modifier(Modifier::DIM),
        )));
    }
    lines.push(Line::from(""));
    lines.extend(verdict.bullets.iter().map(|b| Line::from(format!(" • {b}"))));

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }).block(block), area);
}
