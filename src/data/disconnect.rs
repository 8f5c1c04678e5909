//! Detection of silent data-source failure.

use std::time::Duration;

use routewatch_types::ConnectionState;

/// Default silence after which the stream is considered stale.
pub const DEFAULT_STALE_THRESHOLD: Duration = Duration::from_millis(10_000);

/// Tracks time since the last successful sample.
///
/// Only successes move the reference point. Empty windows and failures are
/// recorded for diagnostics but never make the stream look fresher. The
/// detector knows nothing about the buffer; going stale discards no history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectDetector {
    threshold_ms: u64,
    /// Last success, or the subscription start before any success.
    reference_ms: u64,
    last_success_ms: Option<u64>,
    last_failure_ms: Option<u64>,
}

impl DisconnectDetector {
    /// Create a detector for a stream that started at `started_at_ms`.
    ///
    /// A source that never answers turns stale one threshold after the start.
    pub fn new(threshold: Duration, started_at_ms: u64) -> Self {
        Self {
            threshold_ms: u64::try_from(threshold.as_millis()).unwrap_or(u64::MAX),
            reference_ms: started_at_ms,
            last_success_ms: None,
            last_failure_ms: None,
        }
    }

    /// Record a successful sample at `timestamp_ms`.
    pub fn on_success(&mut self, timestamp_ms: u64) {
        self.reference_ms = self.reference_ms.max(timestamp_ms);
        self.last_success_ms = Some(self.reference_ms);
    }

    /// Record an empty window or a failed fetch. Does not refresh the stream.
    pub fn on_empty_or_failure(&mut self, now_ms: u64) {
        self.last_failure_ms = Some(now_ms);
    }

    /// `Stale` iff more than the threshold has passed since the last success.
    pub fn state(&self, now_ms: u64) -> ConnectionState {
        if self.silence_ms(now_ms) > self.threshold_ms {
            ConnectionState::Stale
        } else {
            ConnectionState::Ok
        }
    }

    /// Milliseconds since the last success (or since the start).
    pub fn silence_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.reference_ms)
    }

    /// Start over as a fresh stream at `now_ms`.
    pub fn reset(&mut self, now_ms: u64) {
        *self = Self {
            threshold_ms: self.threshold_ms,
            reference_ms: now_ms,
            last_success_ms: None,
            last_failure_ms: None,
        };
    }

    pub fn threshold(&self) -> Duration {
        Duration::from_millis(self.threshold_ms)
    }

    pub fn last_success_ms(&self) -> Option<u64> {
        self.last_success_ms
    }

    pub fn last_failure_ms(&self) -> Option<u64> {
        self.last_failure_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_strictly_after_threshold() {
        let mut detector = DisconnectDetector::new(DEFAULT_STALE_THRESHOLD, 0);
        let t0 = 5_000;
        detector.on_success(t0);
        assert_eq!(detector.state(t0 + 9_999), ConnectionState::Ok);
        assert_eq!(detector.state(t0 + 10_000), ConnectionState::Ok);
        assert_eq!(detector.state(t0 + 10_001), ConnectionState::Stale);
    }

    #[test]
    fn failures_do_not_refresh() {
        let mut detector = DisconnectDetector::new(DEFAULT_STALE_THRESHOLD, 0);
        detector.on_success(1_000);
        detector.on_empty_or_failure(8_000);
        detector.on_empty_or_failure(12_000);
        assert_eq!(detector.last_success_ms(), Some(1_000));
        assert_eq!(detector.last_failure_ms(), Some(12_000));
        assert_eq!(detector.state(11_001), ConnectionState::Stale);
    }

    #[test]
    fn never_answering_source_goes_stale_after_start() {
        let detector = DisconnectDetector::new(Duration::from_secs(10), 2_000);
        assert_eq!(detector.last_success_ms(), None);
        assert_eq!(detector.state(12_000), ConnectionState::Ok);
        assert_eq!(detector.state(12_001), ConnectionState::Stale);
    }

    #[test]
    fn success_recovers() {
        let mut detector = DisconnectDetector::new(Duration::from_secs(10), 0);
        assert!(detector.state(20_000).is_stale());
        detector.on_success(20_000);
        assert!(!detector.state(20_500).is_stale());
    }

    #[test]
    fn reset_forgets_history() {
        let mut detector = DisconnectDetector::new(Duration::from_secs(10), 0);
        detector.on_success(1_000);
        detector.reset(50_000);
        assert_eq!(detector.last_success_ms(), None);
        assert_eq!(detector.silence_ms(50_400), 400);
        assert_eq!(detector.threshold(), Duration::from_secs(10));
    }
}
