//! Periodic acquisition with a scoped timer.
//!
//! [`acquire`] starts a timer task and returns a [`PollHandle`]; the timer
//! lives exactly as long as the handle. Releasing the handle, dropping it,
//! or replacing it in a [`PollingScheduler`] all stop the timer, so no exit
//! path can leave a poller running.

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// A running timer bound to a subscription key.
///
/// Drop this handle to stop the timer, or call [`PollHandle::release`].
#[derive(Debug)]
pub struct PollHandle<K: Debug> {
    key: K,
    interval: Duration,
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl<K: Debug> PollHandle<K> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop the timer.
    pub fn release(self) {}

    fn stop(&mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(key = ?self.key, "poll timer released");
        }
    }
}

impl<K: Debug> Drop for PollHandle<K> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Call `tick` now and then every `interval` until the handle is released.
///
/// Each tick runs as its own task, so a slow tick never delays the next one.
/// Must be called from within a tokio runtime.
pub fn acquire<K, F, Fut>(key: K, interval: Duration, tick: F) -> PollHandle<K>
where
    K: Debug,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let interval = interval.max(Duration::from_millis(1));
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
                _ = timer.tick() => {
                    tokio::spawn(tick());
                }
            }
        }
    });

    debug!(?key, ?interval, "poll timer acquired");
    PollHandle {
        key,
        interval,
        stop_tx,
        task: Some(task),
    }
}

/// Holds at most one poll timer at a time.
#[derive(Debug)]
pub struct PollingScheduler<K: Debug> {
    active: Option<PollHandle<K>>,
}

impl<K: Debug> Default for PollingScheduler<K> {
    fn default() -> Self {
        Self { active: None }
    }
}

impl<K: Debug + PartialEq> PollingScheduler<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Poll `key` every `interval`, replacing any timer for another key.
    ///
    /// The previous timer is released before the new one is created. If the
    /// same key is already polled at the same interval nothing changes and
    /// `false` is returned.
    pub fn start<F, Fut>(&mut self, key: K, interval: Duration, tick: F) -> bool
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if let Some(active) = &self.active {
            if active.key() == &key && active.interval() == interval.max(Duration::from_millis(1)) {
                return false;
            }
        }
        self.stop();
        self.active = Some(acquire(key, interval, tick));
        true
    }

    /// Stop polling. Safe to call any number of times.
    pub fn stop(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.release();
        }
    }

    pub fn active_key(&self) -> Option<&K> {
        self.active.as_ref().map(PollHandle::key)
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }
}
