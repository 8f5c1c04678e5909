//! Acquisition orchestration.
//!
//! [`MetricsAggregator`] owns the poll timer and the shared acquisition
//! state. Each tick fetches one metrics window and folds it into the
//! [`TimeSeriesBuffer`] and [`DisconnectDetector`]; the agent verdict is
//! acquired separately on key change, manual refresh and after a run.
//!
//! Ticks run as independent tasks and may overlap. Every tick takes a
//! sequence number and every subscription a generation; a response is
//! dropped if a newer tick already landed or if the subscription it was
//! issued for is gone. The state lock is never held across an `.await`.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use routewatch_adapters::error::DEFAULT_DETAIL_LEN;
use routewatch_adapters::metrics::{DEFAULT_FETCH_TIMEOUT, DEFAULT_WINDOW_SEC};
use routewatch_adapters::{AgentClient, FetchError, MetricsClient, MetricsWindow, Transport};
use routewatch_types::{AgentVerdict, ConnectionState, ExperimentId, ProtocolVersion, Sample};

use crate::clock::Clock;
use crate::data::buffer::DEFAULT_CAPACITY;
use crate::data::disconnect::DEFAULT_STALE_THRESHOLD;
use crate::data::duration::format_age;
use crate::data::{DashboardView, DisconnectDetector, SeriesView, TimeSeriesBuffer};
use crate::poll::PollingScheduler;

/// Default time between ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3_000);

/// Default wait between an accepted run and the forced verdict refetch.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Tunables of the acquisition layer.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorConfig {
    pub poll_interval: Duration,
    pub buffer_capacity: usize,
    pub stale_threshold: Duration,
    /// Per-call timeout of every fetch.
    pub fetch_timeout: Duration,
    pub window_sec: u64,
    /// Preferred agent protocol version.
    pub agent_version: ProtocolVersion,
    pub settle_delay: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            buffer_capacity: DEFAULT_CAPACITY,
            stale_threshold: DEFAULT_STALE_THRESHOLD,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            window_sec: DEFAULT_WINDOW_SEC,
            agent_version: ProtocolVersion::default(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No experiment selected.
    Idle,
    /// A sample was appended.
    Appended,
    /// The window held no samples.
    EmptyWindow,
    /// The fetch failed.
    Failed(FetchError),
    /// The response arrived after a newer one or after a key change.
    Discarded,
}

#[derive(Debug)]
struct State {
    experiment: Option<ExperimentId>,
    generation: u64,
    buffer: TimeSeriesBuffer,
    detector: DisconnectDetector,
    connection: ConnectionState,
    metrics_status: String,
    next_seq: u64,
    landed_seq: u64,
    verdict: Option<AgentVerdict>,
    agent_status: String,
    next_verdict_seq: u64,
    landed_verdict_seq: u64,
}

impl State {
    fn new(config: &AggregatorConfig, now_ms: u64) -> Self {
        Self {
            experiment: None,
            generation: 0,
            buffer: TimeSeriesBuffer::with_capacity(config.buffer_capacity),
            detector: DisconnectDetector::new(config.stale_threshold, now_ms),
            connection: ConnectionState::Ok,
            metrics_status: String::new(),
            next_seq: 0,
            landed_seq: 0,
            verdict: None,
            agent_status: String::new(),
            next_verdict_seq: 0,
            landed_verdict_seq: 0,
        }
    }

    /// Re-evaluate the connection state, logging transitions once.
    fn evaluate(&mut self, now_ms: u64) -> ConnectionState {
        let current = self.detector.state(now_ms);
        if current != self.connection {
            let silence = format_age(self.detector.silence_ms(now_ms));
            match current {
                ConnectionState::Stale => warn!(experiment = ?self.experiment, %silence, "metrics stream went stale"),
                ConnectionState::Ok => info!(experiment = ?self.experiment, "metrics stream recovered"),
            }
            self.connection = current;
        }
        current
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<State>,
    metrics: MetricsClient,
    agent: AgentClient,
    clock: Arc<dyn Clock>,
    config: AggregatorConfig,
}

/// Cloneable access to the acquisition state.
///
/// Every operation except polling lives here, so spawned ticks and UI
/// actions can share it freely.
#[derive(Debug, Clone)]
pub struct AggregatorHandle {
    shared: Arc<Shared>,
}

impl AggregatorHandle {
    fn new(transport: Arc<dyn Transport>, clock: Arc<dyn Clock>, config: AggregatorConfig) -> Self {
        let metrics = MetricsClient::new(transport.clone())
            .timeout(config.fetch_timeout)
            .window_sec(config.window_sec);
        let agent = AgentClient::new(transport).timeout(config.fetch_timeout);
        let state = State::new(&config, clock.now_ms());

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                metrics,
                agent,
                clock,
                config,
            }),
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.shared.config
    }

    /// Switch the stream to `key` without touching the poller.
    ///
    /// A different key starts a fresh stream: empty buffer, detector
    /// restarted now, statuses cleared, and every in-flight tick orphaned.
    /// Returns `false` if `key` is already the current experiment.
    pub fn focus(&self, key: ExperimentId) -> bool {
        let now = self.shared.clock.now_ms();
        let mut state = self.shared.state.lock();
        if state.experiment.as_ref() == Some(&key) {
            return false;
        }

        info!(from = ?state.experiment, to = %key, "switching experiment");
        state.generation += 1;
        state.landed_seq = state.next_seq;
        state.buffer = TimeSeriesBuffer::with_capacity(self.shared.config.buffer_capacity);
        state.detector.reset(now);
        state.connection = ConnectionState::Ok;
        state.metrics_status.clear();
        state.experiment = Some(key);
        true
    }

    /// Run one acquisition for the current experiment.
    pub async fn tick(&self) -> TickOutcome {
        let generation = self.shared.state.lock().generation;
        self.tick_generation(generation).await
    }

    /// Run one acquisition on behalf of subscription `generation`.
    async fn tick_generation(&self, generation: u64) -> TickOutcome {
        let (experiment, seq) = {
            let mut state = self.shared.state.lock();
            if state.generation != generation {
                return TickOutcome::Discarded;
            }
            let Some(experiment) = state.experiment.clone() else {
                return TickOutcome::Idle;
            };
            state.next_seq += 1;
            (experiment, state.next_seq)
        };

        debug!(%experiment, seq, "polling metrics");
        let result = self.shared.metrics.fetch(&experiment).await;
        let now = self.shared.clock.now_ms();

        let mut state = self.shared.state.lock();
        if state.generation != generation || seq <= state.landed_seq {
            debug!(%experiment, seq, landed = state.landed_seq, "dropping late metrics response");
            return TickOutcome::Discarded;
        }
        state.landed_seq = seq;

        match result {
            Ok(MetricsWindow::Reading(reading)) => {
                state.buffer.append(reading.into_sample(now));
                state.detector.on_success(now);
                state.evaluate(now);
                state.metrics_status.clear();
                TickOutcome::Appended
            }
            Ok(MetricsWindow::Empty) => {
                state.detector.on_empty_or_failure(now);
                state.metrics_status = match state.evaluate(now) {
                    ConnectionState::Stale => format!(
                        "No new samples for {}; showing last data",
                        format_age(state.detector.silence_ms(now))
                    ),
                    ConnectionState::Ok => String::new(),
                };
                TickOutcome::EmptyWindow
            }
            Err(err) => {
                state.detector.on_empty_or_failure(now);
                let connection = state.evaluate(now);
                let detail = err.detail(DEFAULT_DETAIL_LEN);
                let silence = format_age(state.detector.silence_ms(now));
                state.metrics_status = if !connection.is_stale() {
                    debug!(%experiment, error = %err, "metrics fetch failed within stale threshold");
                    String::new()
                } else if err.is_transient() {
                    format!("Metrics source unreachable for {silence}: {detail}")
                } else {
                    warn!(%experiment, error = %err, "metrics request failing");
                    format!("Metrics request failing for {silence}: {detail}")
                };
                TickOutcome::Failed(err)
            }
        }
    }

    /// Fetch the agent verdict through the version cascade.
    ///
    /// Success replaces the stored verdict wholesale. Failure keeps the
    /// previous verdict and only sets the agent status.
    pub async fn refresh_verdict(&self) -> Result<AgentVerdict, FetchError> {
        let seq = {
            let mut state = self.shared.state.lock();
            state.next_verdict_seq += 1;
            state.next_verdict_seq
        };

        let preferred = self.shared.config.agent_version;
        let result = self.shared.agent.summary_versioned(preferred).await;

        let mut state = self.shared.state.lock();
        let latest = seq > state.landed_verdict_seq;
        if latest {
            state.landed_verdict_seq = seq;
        }

        match result {
            Ok(versioned) => {
                if versioned.fell_back() {
                    info!(
                        requested = %versioned.requested,
                        served = %versioned.version,
                        "agent verdict served by fallback version"
                    );
                }
                let verdict = versioned.value;
                if latest {
                    state.verdict = Some(verdict.clone());
                    state.agent_status.clear();
                }
                Ok(verdict)
            }
            Err(err) => {
                warn!(error = %err, "agent verdict unavailable");
                if latest {
                    state.agent_status =
                        format!("Agent summary unavailable: {}", err.detail(DEFAULT_DETAIL_LEN));
                }
                Err(err)
            }
        }
    }

    /// Ask the agent to run, wait for the backend to settle, then refetch.
    pub async fn run_agent(&self, dry: bool) -> Result<AgentVerdict, FetchError> {
        let preferred = self.shared.config.agent_version;
        match self.shared.agent.run(preferred, dry).await {
            Ok(version) => info!(%version, dry, "agent run accepted"),
            Err(err) => {
                warn!(error = %err, dry, "agent run rejected");
                self.shared.state.lock().agent_status =
                    format!("Agent run failed: {}", err.detail(DEFAULT_DETAIL_LEN));
                return Err(err);
            }
        }

        tokio::time::sleep(self.shared.config.settle_delay).await;
        self.refresh_verdict().await
    }

    /// Spawn [`run_agent`](Self::run_agent) without waiting for it.
    pub fn trigger_run(&self, dry: bool) -> JoinHandle<Result<AgentVerdict, FetchError>> {
        let handle = self.clone();
        tokio::spawn(async move { handle.run_agent(dry).await })
    }

    /// Spawn [`refresh_verdict`](Self::refresh_verdict) without waiting for it.
    pub fn trigger_refresh(&self) -> JoinHandle<Result<AgentVerdict, FetchError>> {
        let handle = self.clone();
        tokio::spawn(async move { handle.refresh_verdict().await })
    }

    /// Snapshot everything the presentation layer needs.
    pub fn view(&self) -> DashboardView {
        let now = self.shared.clock.now_ms();
        let state = self.shared.state.lock();
        DashboardView {
            experiment: state.experiment.clone(),
            connection: state.detector.state(now),
            silence_ms: state.detector.silence_ms(now),
            metrics_status: state.metrics_status.clone(),
            agent_status: state.agent_status.clone(),
            verdict: state.verdict.clone(),
            series: SeriesView::derive(&state.buffer),
        }
    }

    pub fn experiment(&self) -> Option<ExperimentId> {
        self.shared.state.lock().experiment.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        let now = self.shared.clock.now_ms();
        self.shared.state.lock().detector.state(now)
    }

    pub fn metrics_status(&self) -> String {
        self.shared.state.lock().metrics_status.clone()
    }

    pub fn agent_status(&self) -> String {
        self.shared.state.lock().agent_status.clone()
    }

    pub fn verdict(&self) -> Option<AgentVerdict> {
        self.shared.state.lock().verdict.clone()
    }

    /// Buffered samples, oldest first.
    pub fn samples(&self) -> Vec<Sample> {
        self.shared.state.lock().buffer.series().cloned().collect()
    }

    fn generation(&self) -> u64 {
        self.shared.state.lock().generation
    }

    /// Orphan every in-flight tick of the current subscription.
    fn detach(&self) {
        let mut state = self.shared.state.lock();
        state.generation += 1;
        state.landed_seq = state.next_seq;
    }
}

/// Owns the poll timer for the current subscription.
///
/// Dropping the aggregator stops polling. Clones of its
/// [`AggregatorHandle`] stay usable but no longer receive ticks.
#[derive(Debug)]
pub struct MetricsAggregator {
    handle: AggregatorHandle,
    scheduler: PollingScheduler<ExperimentId>,
}

impl MetricsAggregator {
    pub fn new(transport: Arc<dyn Transport>, clock: Arc<dyn Clock>, config: AggregatorConfig) -> Self {
        Self {
            handle: AggregatorHandle::new(transport, clock, config),
            scheduler: PollingScheduler::new(),
        }
    }

    /// Poll `key`, starting a fresh stream if it differs from the current one.
    ///
    /// A key change also refreshes the agent verdict in the background.
    /// Must be called from within a tokio runtime.
    pub fn subscribe(&mut self, key: ExperimentId) {
        let changed = self.handle.focus(key.clone());
        let generation = self.handle.generation();
        let interval = self.handle.config().poll_interval;
        let handle = self.handle.clone();

        self.scheduler.start(key, interval, move || {
            let handle = handle.clone();
            async move {
                handle.tick_generation(generation).await;
            }
        });

        if changed {
            drop(self.handle.trigger_refresh());
        }
    }

    /// Stop polling. Buffered data stays visible.
    ///
    /// Ticks still in flight are orphaned and never touch the buffer.
    pub fn unsubscribe(&mut self) {
        self.scheduler.stop();
        self.handle.detach();
    }

    pub fn is_polling(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn handle(&self) -> &AggregatorHandle {
        &self.handle
    }

    pub async fn tick(&self) -> TickOutcome {
        self.handle.tick().await
    }

    pub async fn refresh_verdict(&self) -> Result<AgentVerdict, FetchError> {
        self.handle.refresh_verdict().await
    }

    pub async fn run_agent(&self, dry: bool) -> Result<AgentVerdict, FetchError> {
        self.handle.run_agent(dry).await
    }

    pub fn view(&self) -> DashboardView {
        self.handle.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use routewatch_adapters::{Reply, ScriptedTransport};
    use routewatch_types::Verdict;

    const GOOD: &str = r#"{"ok":true,"p95":120,"qps":5,"err_pct":0,"route_share":{"x":1,"y":0},"samples":10}"#;
    const NAN: &str = r#"{"ok":true,"p95":"NaN","qps":5,"err_pct":0,"route_share":{"x":1,"y":0},"samples":10}"#;
    const EMPTY: &str = r#"{"ok":true,"p95":0,"qps":0,"err_pct":0,"route_share":{},"samples":0}"#;
    const PASS: &str = r#"{"ok":true,"verdict":"PASS","bullets":["ok"]}"#;

    fn setup(transport: ScriptedTransport) -> (AggregatorHandle, Arc<ScriptedTransport>, ManualClock) {
        let transport = Arc::new(transport);
        let clock = ManualClock::new(0);
        let handle = AggregatorHandle::new(
            transport.clone(),
            Arc::new(clock.clone()),
            AggregatorConfig::default(),
        );
        handle.focus(ExperimentId::new("exp-a"));
        (handle, transport, clock)
    }

    fn connection_error() -> Reply {
        Reply::error(FetchError::Connection("connection refused".into()))
    }

    #[tokio::test]
    async fn idle_without_experiment() {
        let transport: Arc<dyn Transport> = Arc::new(ScriptedTransport::new());
        let handle = AggregatorHandle::new(transport, Arc::new(ManualClock::new(0)), AggregatorConfig::default());
        assert_eq!(handle.tick().await, TickOutcome::Idle);
    }

    #[tokio::test]
    async fn nan_sample_is_sanitized_not_dropped() {
        let (handle, _, clock) = setup(
            ScriptedTransport::new()
                .on_get("/metrics/mini", Reply::json(200, GOOD))
                .on_get("/metrics/mini", Reply::json(200, NAN)),
        );

        assert_eq!(handle.tick().await, TickOutcome::Appended);
        clock.advance(Duration::from_secs(3));
        assert_eq!(handle.tick().await, TickOutcome::Appended);

        let samples = handle.samples();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].p95_ms, 120.0);
        assert_eq!(samples[1].p95_ms, 0.0);
        assert_eq!(samples[1].route_share.get("x"), Some(&1.0));
        assert!(handle.metrics_status().is_empty());
    }

    #[tokio::test]
    async fn sustained_failure_turns_stale_exactly_once() {
        let (handle, transport, clock) = setup(ScriptedTransport::new().on_get("/metrics/mini", Reply::json(200, GOOD)));
        assert_eq!(handle.tick().await, TickOutcome::Appended);
        transport.push_get("/metrics/mini", connection_error());

        let mut transitions = 0;
        let mut previous = handle.connection_state();
        for second in 1..=11 {
            clock.advance(Duration::from_secs(1));
            assert!(matches!(handle.tick().await, TickOutcome::Failed(_)));

            let current = handle.connection_state();
            if current != previous {
                transitions += 1;
                assert_eq!(second, 11, "went stale too early");
            }
            previous = current;
        }

        assert_eq!(transitions, 1);
        assert_eq!(handle.connection_state(), ConnectionState::Stale);
        assert!(handle.metrics_status().starts_with("Metrics source unreachable for 11.0s"));
        assert_eq!(handle.samples().len(), 1, "history survives staleness");
    }

    #[tokio::test]
    async fn transient_failure_is_silent_until_stale() {
        let (handle, _, clock) = setup(ScriptedTransport::new().on_get("/metrics/mini", connection_error()));
        clock.advance(Duration::from_secs(2));
        assert!(matches!(handle.tick().await, TickOutcome::Failed(_)));
        assert!(handle.metrics_status().is_empty());
        assert_eq!(handle.connection_state(), ConnectionState::Ok);
    }

    #[tokio::test]
    async fn http_error_is_silent_until_stale() {
        let (handle, transport, clock) = setup(ScriptedTransport::new().on_get("/metrics/mini", Reply::json(200, GOOD)));
        assert_eq!(handle.tick().await, TickOutcome::Appended);

        transport.push_get("/metrics/mini", Reply::json(500, "blip"));
        clock.advance(Duration::from_secs(3));
        assert!(matches!(handle.tick().await, TickOutcome::Failed(FetchError::Http { status: 500, .. })));
        assert_eq!(handle.connection_state(), ConnectionState::Ok);
        assert!(handle.metrics_status().is_empty());

        clock.advance(Duration::from_secs(8));
        assert!(matches!(handle.tick().await, TickOutcome::Failed(FetchError::Http { status: 500, .. })));
        assert_eq!(handle.connection_state(), ConnectionState::Stale);
        assert!(handle.metrics_status().starts_with("Metrics request failing for 11.0s"));
        assert!(handle.metrics_status().contains("blip"));
    }

    #[tokio::test]
    async fn empty_window_keeps_chart_and_reports_staleness() {
        let (handle, transport, clock) = setup(ScriptedTransport::new().on_get("/metrics/mini", Reply::json(200, GOOD)));
        handle.tick().await;
        transport.push_get("/metrics/mini", Reply::json(200, EMPTY));

        clock.advance(Duration::from_secs(5));
        assert_eq!(handle.tick().await, TickOutcome::EmptyWindow);
        assert!(handle.metrics_status().is_empty());

        clock.advance(Duration::from_secs(6));
        assert_eq!(handle.tick().await, TickOutcome::EmptyWindow);
        assert_eq!(handle.metrics_status(), "No new samples for 11.0s; showing last data");
        assert_eq!(handle.samples().len(), 1);
    }

    #[tokio::test]
    async fn recovery_clears_status() {
        let (handle, transport, clock) = setup(ScriptedTransport::new().on_get("/metrics/mini", connection_error()));
        clock.advance(Duration::from_secs(11));
        handle.tick().await;
        assert_eq!(handle.connection_state(), ConnectionState::Stale);

        transport.push_get("/metrics/mini", Reply::json(200, GOOD));
        handle.tick().await;
        assert_eq!(handle.connection_state(), ConnectionState::Ok);
        assert!(handle.metrics_status().is_empty());
    }

    #[tokio::test]
    async fn verdict_falls_back_to_v2() {
        let (handle, transport, _) = setup(
            ScriptedTransport::new()
                .on_get("/agent/summary?v=3", Reply::status(503))
                .on_get("/agent/summary?v=2", Reply::json(200, PASS)),
        );

        let verdict = handle.refresh_verdict().await.unwrap();
        assert_eq!(verdict.verdict, Verdict::Pass);
        assert_eq!(verdict.version, ProtocolVersion::V2);

        let stored = handle.verdict().unwrap();
        assert_eq!(stored.verdict, Verdict::Pass);
        assert_eq!(stored.version.number(), 2);
        assert_eq!(stored.bullets, vec!["ok".to_string()]);
        assert_eq!(transport.call_count("/agent/summary"), 2);
    }

    #[tokio::test]
    async fn agent_failure_is_isolated_from_metrics() {
        let (handle, transport, _) = setup(
            ScriptedTransport::new()
                .on_get("/metrics/mini", Reply::json(200, GOOD))
                .on_get("/agent/summary", Reply::json(200, PASS)),
        );
        handle.tick().await;
        handle.refresh_verdict().await.unwrap();

        transport.push_get("/agent/summary", Reply::status(500));
        assert!(handle.refresh_verdict().await.is_err());

        assert_eq!(handle.samples().len(), 1);
        assert!(handle.metrics_status().is_empty());
        assert!(handle.agent_status().starts_with("Agent summary unavailable"));
        assert_eq!(handle.verdict().map(|v| v.verdict), Some(Verdict::Pass));
    }

    #[tokio::test]
    async fn key_change_starts_fresh_stream() {
        let (handle, _, clock) = setup(ScriptedTransport::new().on_get("/metrics/mini", Reply::json(200, GOOD)));
        handle.tick().await;
        clock.advance(Duration::from_secs(30));
        assert_eq!(handle.connection_state(), ConnectionState::Stale);

        assert!(handle.focus(ExperimentId::new("exp-b")));
        assert!(!handle.focus(ExperimentId::new("exp-b")));
        assert!(handle.samples().is_empty());
        assert_eq!(handle.connection_state(), ConnectionState::Ok);
        assert_eq!(handle.view().experiment, Some(ExperimentId::new("exp-b")));
    }

    #[tokio::test(start_paused = true)]
    async fn late_response_is_dropped() {
        let (handle, _, _) = setup(
            ScriptedTransport::new()
                .on_get("/metrics/mini", Reply::json(200, NAN).after(Duration::from_secs(2)))
                .on_get("/metrics/mini", Reply::json(200, GOOD)),
        );

        let (slow, fast) = tokio::join!(handle.tick(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.tick().await
        });

        assert_eq!(fast, TickOutcome::Appended);
        assert_eq!(slow, TickOutcome::Discarded);
        let samples = handle.samples();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].p95_ms, 120.0);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_response_of_previous_key_is_ignored() {
        let (handle, _, _) = setup(
            ScriptedTransport::new().on_get("/metrics/mini", Reply::json(200, GOOD).after(Duration::from_secs(1))),
        );

        let (outcome, _) = tokio::join!(handle.tick(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.focus(ExperimentId::new("exp-b"))
        });

        assert_eq!(outcome, TickOutcome::Discarded);
        assert!(handle.samples().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn run_waits_for_settle_then_refetches() {
        let (handle, transport, _) = setup(
            ScriptedTransport::new()
                .on_post("/agent/run", Reply::status(200))
                .on_get("/agent/summary", Reply::json(200, PASS)),
        );

        let started = tokio::time::Instant::now();
        let verdict = handle.run_agent(true).await.unwrap();

        assert!(started.elapsed() >= DEFAULT_SETTLE_DELAY);
        assert_eq!(verdict.verdict, Verdict::Pass);
        assert_eq!(
            transport.calls(),
            vec!["POST /agent/run?v=3&dry=true".to_string(), "GET /agent/summary?v=3".to_string()]
        );
    }

    #[tokio::test]
    async fn failed_run_skips_refetch() {
        let (handle, transport, _) = setup(ScriptedTransport::new().on_post("/agent/run", Reply::status(500)));
        assert!(handle.trigger_run(false).await.unwrap().is_err());
        assert_eq!(transport.call_count("/agent/summary"), 0);
        assert!(handle.agent_status().starts_with("Agent run failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn subscribe_polls_and_refreshes_verdict() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on_get("/metrics/mini", Reply::json(200, GOOD))
                .on_get("/agent/summary", Reply::json(200, PASS)),
        );
        let mut aggregator = MetricsAggregator::new(
            transport.clone(),
            Arc::new(ManualClock::new(0)),
            AggregatorConfig::default(),
        );

        aggregator.subscribe(ExperimentId::new("exp-a"));
        tokio::time::sleep(Duration::from_millis(6_500)).await;

        assert!(aggregator.is_polling());
        assert_eq!(transport.call_count("/metrics/mini"), 3);
        assert_eq!(transport.call_count("/agent/summary"), 1);
        assert_eq!(aggregator.handle().samples().len(), 3);

        aggregator.unsubscribe();
        aggregator.unsubscribe();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(transport.call_count("/metrics/mini"), 3);
        assert_eq!(aggregator.view().series.samples, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn resubscribing_to_another_key_stops_old_ticks() {
        let transport = Arc::new(ScriptedTransport::new().on_get("/metrics/mini", Reply::json(200, GOOD)));
        let mut aggregator = MetricsAggregator::new(
            transport.clone(),
            Arc::new(ManualClock::new(0)),
            AggregatorConfig::default(),
        );

        aggregator.subscribe(ExperimentId::new("exp-a"));
        aggregator.subscribe(ExperimentId::new("exp-b"));
        tokio::time::sleep(Duration::from_millis(3_500)).await;

        let calls = transport.calls();
        assert!(calls.iter().all(|call| !call.contains("exp_id=exp-a")));
        assert_eq!(transport.call_count("/metrics/mini?exp_id=exp-b"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribe_orphans_in_flight_tick() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on_get("/metrics/mini", Reply::json(200, GOOD).after(Duration::from_secs(2)))
                .on_get("/agent/summary", Reply::json(200, PASS)),
        );
        let mut aggregator = MetricsAggregator::new(
            transport.clone(),
            Arc::new(ManualClock::new(0)),
            AggregatorConfig::default(),
        );

        aggregator.subscribe(ExperimentId::new("exp-a"));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(transport.call_count("/metrics/mini"), 1);

        aggregator.unsubscribe();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(aggregator.handle().samples().is_empty());

        aggregator.subscribe(ExperimentId::new("exp-a"));
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(aggregator.handle().samples().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_rerun_keeps_previous_verdict() {
        let (handle, transport, _) = setup(
            ScriptedTransport::new()
                .on_post("/agent/run", Reply::status(200))
                .on_get("/agent/summary", Reply::json(200, PASS)),
        );
        handle.run_agent(false).await.unwrap();

        transport.push_post("/agent/run", Reply::status(500));
        assert!(handle.run_agent(false).await.is_err());

        assert!(handle.agent_status().starts_with("Agent run failed"));
        assert_eq!(handle.verdict().map(|v| v.verdict), Some(Verdict::Pass));
        assert_eq!(transport.call_count("/agent/summary"), 1);
    }
}
