use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;

/// Where the `e` key writes the current view.
const EXPORT_FILE: &str = "routewatch_export.json";

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),

        // Subscription key change
        KeyCode::Char('n') | KeyCode::Right | KeyCode::Tab => app.next_experiment(),
        KeyCode::Char('p') | KeyCode::Left | KeyCode::BackTab => app.prev_experiment(),

        // Agent verdict
        KeyCode::Char('r') => app.refresh_verdict(),
        KeyCode::Char('x') => app.run_agent(false),
        KeyCode::Char('d') => app.run_agent(true),

        KeyCode::Char('?') => app.toggle_help(),

        KeyCode::Char('e') => {
            let export_path = PathBuf::from(EXPORT_FILE);
            match app.export_state(&export_path) {
                Ok(()) => {
                    app.set_status_message(format!("Exported to {}", export_path.display()));
                }
                Err(e) => {
                    app.set_status_message(format!("Export failed: {}", e));
                }
            }
        }

        _ => {}
    }
}
