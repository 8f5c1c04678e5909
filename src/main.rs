use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    event::Event,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};

use routewatch::data::duration::{format_age, parse_duration};
use routewatch::logging::{self, LogTarget, DEFAULT_LOG_FILE};
use routewatch::ui::{self, Theme};
use routewatch::{events, App, MetricsAggregator, Settings, SystemClock, TickOutcome};
use routewatch_adapters::HttpTransport;
use routewatch_types::{ExperimentId, ProtocolVersion};

#[derive(Parser, Debug)]
#[command(name = "routewatch")]
#[command(about = "Terminal dashboard for live latency, routing and agent-verdict telemetry")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dashboard API endpoint (e.g., "http://localhost:8000")
    #[arg(long)]
    endpoint: Option<String>,

    /// Experiment to watch; repeat to cycle between several
    #[arg(long = "exp", value_name = "ID")]
    experiments: Vec<String>,

    /// Poll interval (e.g., "3s", "500ms")
    #[arg(short, long)]
    interval: Option<String>,

    /// Preferred agent protocol version (3 falls back to 2)
    #[arg(long, value_parser = clap::value_parser!(u8).range(2..=3))]
    agent_version: Option<u8>,

    /// Log file used while the TUI owns the terminal
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Log one line per poll instead of drawing the TUI
    #[arg(long, conflicts_with = "export")]
    headless: bool,

    /// Take one snapshot, write it to this JSON file and exit
    #[arg(short, long)]
    export: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = resolve_settings(&args)?;

    if args.headless || args.export.is_some() {
        logging::init(LogTarget::Stderr)?;
    } else {
        logging::init(LogTarget::File(&args.log_file))?;
    }

    let transport = HttpTransport::builder()
        .endpoint(settings.endpoint.clone())
        .timeout(settings.aggregator.fetch_timeout)
        .build()?;

    let rt = tokio::runtime::Runtime::new()?;
    let _guard = rt.enter();

    let aggregator = MetricsAggregator::new(
        Arc::new(transport),
        Arc::new(SystemClock::new()),
        settings.aggregator.clone(),
    );

    if let Some(export_path) = args.export {
        return rt.block_on(export_to_file(aggregator, &settings, &export_path));
    }

    if args.headless {
        return rt.block_on(run_headless(aggregator, &settings));
    }

    run_tui(App::new(
        aggregator,
        settings.experiments.clone(),
        settings.endpoint.clone(),
        Theme::auto_detect(),
    ))
}

/// Config file and environment first, then command-line flags.
fn resolve_settings(args: &Args) -> Result<Settings> {
    let mut settings = Settings::load(args.config.as_deref())?;

    if let Some(endpoint) = &args.endpoint {
        settings.endpoint = endpoint.trim_end_matches('/').to_string();
    }
    if !args.experiments.is_empty() {
        settings.experiments = args.experiments.iter().map(|e| ExperimentId::from(e.as_str())).collect();
    }
    if let Some(interval) = &args.interval {
        settings.aggregator.poll_interval =
            parse_duration(interval).with_context(|| format!("Invalid --interval {interval:?}"))?;
    }
    if let Some(version) = args.agent_version {
        settings.aggregator.agent_version = ProtocolVersion::new(version);
    }

    Ok(settings)
}

fn first_experiment(settings: &Settings) -> Result<ExperimentId> {
    match settings.experiments.first() {
        Some(experiment) => Ok(experiment.clone()),
        None => bail!("No experiment configured; pass --exp or set `experiments` in the config"),
    }
}

/// Poll the first experiment and log a summary line per interval until Ctrl-C.
async fn run_headless(mut aggregator: MetricsAggregator, settings: &Settings) -> Result<()> {
    let experiment = first_experiment(settings)?;
    if settings.experiments.len() > 1 {
        warn!("headless mode watches only {experiment}");
    }

    info!(endpoint = %settings.endpoint, %experiment, "starting headless watch");
    aggregator.subscribe(experiment);

    let mut ticker = tokio::time::interval(settings.aggregator.poll_interval);
    ticker.tick().await;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = ticker.tick() => log_view(&aggregator),
        }
    }

    aggregator.unsubscribe();
    info!("stopped");
    Ok(())
}

fn log_view(aggregator: &MetricsAggregator) {
    let view = aggregator.view();
    let verdict = view
        .verdict
        .as_ref()
        .map(|v| format!("{} ({})", v.verdict, v.version))
        .unwrap_or_else(|| "-".to_string());

    match &view.series.latest {
        Some(latest) => info!(
            connection = view.connection.label(),
            samples = view.series.samples,
            p95_ms = latest.p95_ms,
            qps = latest.qps,
            err_pct = latest.err_pct,
            %verdict,
            "{}",
            view.metrics_status
        ),
        None => info!(
            connection = view.connection.label(),
            silence = %format_age(view.silence_ms),
            %verdict,
            "no samples yet {}",
            view.metrics_status
        ),
    }
}

/// Take one snapshot and write the view as pretty JSON.
async fn export_to_file(aggregator: MetricsAggregator, settings: &Settings, path: &Path) -> Result<()> {
    let experiment = first_experiment(settings)?;
    let handle = aggregator.handle();
    handle.focus(experiment);

    let (tick, verdict) = tokio::join!(handle.tick(), handle.refresh_verdict());
    if let TickOutcome::Failed(err) = tick {
        warn!(error = %err, "metrics unavailable for export");
    }
    if let Err(err) = verdict {
        warn!(error = %err, "verdict unavailable for export");
    }

    let json = serde_json::to_string_pretty(&handle.view())?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Exported dashboard view to: {}", path.display());
    Ok(())
}

/// Run the TUI until the user quits.
fn run_tui(mut app: App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 12;

    while app.running {
        app.refresh_view();

        terminal.draw(|frame| {
            let area = frame.area();

            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                let msg = format!(
                    "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                    area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                );
                let paragraph = ratatui::widgets::Paragraph::new(msg)
                    .alignment(ratatui::layout::Alignment::Center)
                    .style(ratatui::style::Style::default().fg(ratatui::style::Color::Yellow));
                let centered = ratatui::layout::Rect::new(
                    0,
                    (area.height / 2).saturating_sub(2),
                    area.width,
                    5u16.min(area.height),
                );
                frame.render_widget(paragraph, centered);
                return;
            }

            ui::draw(frame, app);
        })?;

        // Poll for events with a short timeout
        if let Some(Event::Key(key)) = events::poll_event(Duration::from_millis(200))? {
            events::handle_key_event(app, key);
        }
    }

    Ok(())
}
