//! Application state and user actions.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use routewatch_types::ExperimentId;

use crate::aggregator::MetricsAggregator;
use crate::data::DashboardView;
use crate::ui::Theme;

/// How long a transient status message stays visible.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// Main application state.
pub struct App {
    pub running: bool,
    pub show_help: bool,

    aggregator: MetricsAggregator,
    pub experiments: Vec<ExperimentId>,
    pub selected: usize,
    pub endpoint: String,

    /// Snapshot taken once per frame.
    pub view: DashboardView,

    // UI
    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create the app and subscribe to the first experiment, if any.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        aggregator: MetricsAggregator,
        experiments: Vec<ExperimentId>,
        endpoint: impl Into<String>,
        theme: Theme,
    ) -> Self {
        let view = aggregator.view();
        let mut app = Self {
            running: true,
            show_help: false,
            aggregator,
            experiments,
            selected: 0,
            endpoint: endpoint.into(),
            view,
            theme,
            status_message: None,
        };
        app.subscribe_selected();
        app
    }

    /// The experiment currently polled.
    pub fn active_experiment(&self) -> Option<&ExperimentId> {
        self.experiments.get(self.selected)
    }

    /// Take a fresh snapshot of the acquisition state.
    pub fn refresh_view(&mut self) {
        self.view = self.aggregator.view();
    }

    /// Switch to the next experiment, wrapping around.
    pub fn next_experiment(&mut self) {
        if self.experiments.len() < 2 {
            return;
        }
        self.selected = (self.selected + 1) % self.experiments.len();
        self.subscribe_selected();
    }

    /// Switch to the previous experiment, wrapping around.
    pub fn prev_experiment(&mut self) {
        if self.experiments.len() < 2 {
            return;
        }
        self.selected = self
            .selected
            .checked_sub(1)
            .unwrap_or(self.experiments.len() - 1);
        self.subscribe_selected();
    }

    fn subscribe_selected(&mut self) {
        if let Some(experiment) = self.experiments.get(self.selected).cloned() {
            self.aggregator.subscribe(experiment);
            self.refresh_view();
        }
    }

    /// Refetch the agent verdict in the background.
    pub fn refresh_verdict(&mut self) {
        drop(self.aggregator.handle().trigger_refresh());
        self.set_status_message("Refreshing verdict…".to_string());
    }

    /// Ask the agent to recompute its verdict in the background.
    pub fn run_agent(&mut self, dry: bool) {
        drop(self.aggregator.handle().trigger_run(dry));
        let label = if dry { "Dry run requested" } else { "Agent run requested" };
        self.set_status_message(label.to_string());
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
        self.aggregator.unsubscribe();
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        match &self.status_message {
            Some((msg, time)) if time.elapsed() < STATUS_MESSAGE_TTL => Some(msg),
            _ => None,
        }
    }

    /// Export the current view to a JSON file.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.view)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
