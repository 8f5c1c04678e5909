//! Protocol-version fallback for multi-version data sources.
//!
//! A fetch cycle walks a priority-ordered list of versions:
//!
//! ```text
//! Requesting(v3) ──ok──▶ Done(v3)
//!       │
//!     error
//!       ▼
//! Requesting(v2) ──ok──▶ Done(v2)
//!       │
//!     error
//!       ▼
//!    Failed
//! ```
//!
//! Adding a version is a change to the list, not to the control flow.

use std::future::Future;

use routewatch_types::ProtocolVersion;
use tracing::{debug, warn};

use crate::FetchError;

/// Observable state of one fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeState {
    /// Waiting on an attempt at this version.
    Requesting(ProtocolVersion),
    /// This version answered.
    Done(ProtocolVersion),
    /// Every candidate version failed.
    Failed,
}

impl CascadeState {
    /// Returns true for `Done` and `Failed`.
    pub fn is_terminal(self) -> bool {
        !matches!(self, CascadeState::Requesting(_))
    }
}

/// A value together with the version that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    /// Version that satisfied the request.
    pub version: ProtocolVersion,
    /// Version that was asked for.
    pub requested: ProtocolVersion,
    /// Failed attempts, in the order they were made.
    pub failures: Vec<(ProtocolVersion, FetchError)>,
    /// States the cycle passed through, ending in `Done`.
    pub trail: Vec<CascadeState>,
}

impl<T> Versioned<T> {
    /// Returns true if a lower version had to answer.
    pub fn fell_back(&self) -> bool {
        self.version != self.requested
    }
}

/// Walks a priority-ordered version list until one attempt succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedSourceClient {
    versions: Vec<ProtocolVersion>,
}

impl Default for VersionedSourceClient {
    fn default() -> Self {
        Self::new(ProtocolVersion::PRIORITY)
    }
}

impl VersionedSourceClient {
    /// Create a client over `versions`; order and duplicates do not matter.
    pub fn new(versions: impl IntoIterator<Item = ProtocolVersion>) -> Self {
        let mut versions: Vec<ProtocolVersion> = versions.into_iter().collect();
        versions.sort_unstable_by(|a, b| b.cmp(a));
        versions.dedup();
        Self { versions }
    }

    /// Supported versions, highest first.
    pub fn versions(&self) -> &[ProtocolVersion] {
        &self.versions
    }

    /// The versions a fetch preferring `preferred` will try, in order.
    ///
    /// `preferred` comes first even if it is not in the list, followed by
    /// every listed version below it.
    pub fn attempt_order(&self, preferred: ProtocolVersion) -> Vec<ProtocolVersion> {
        std::iter::once(preferred)
            .chain(self.versions.iter().copied().filter(|v| *v < preferred))
            .collect()
    }

    /// Run `attempt` for each candidate version until one succeeds.
    ///
    /// Returns the terminal error when the last candidate fails; never a
    /// value from an earlier, failed attempt.
    pub async fn fetch_versioned<T, F, Fut>(
        &self,
        preferred: ProtocolVersion,
        mut attempt: F,
    ) -> Result<Versioned<T>, FetchError>
    where
        F: FnMut(ProtocolVersion) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut candidates = self.attempt_order(preferred).into_iter();
        let mut failures = Vec::new();
        let mut state = candidates
            .next()
            .map_or(CascadeState::Failed, CascadeState::Requesting);
        let mut trail = vec![state];

        while let CascadeState::Requesting(version) = state {
            match attempt(version).await {
                Ok(value) => {
                    trail.push(CascadeState::Done(version));
                    debug!(%version, %preferred, "versioned fetch satisfied");
                    return Ok(Versioned {
                        value,
                        version,
                        requested: preferred,
                        failures,
                        trail,
                    });
                }
                Err(err) => {
                    state = match candidates.next() {
                        Some(next) => {
                            warn!(%version, fallback = %next, error = %err, "falling back to lower protocol version");
                            CascadeState::Requesting(next)
                        }
                        None => {
                            warn!(%version, error = %err, "no lower protocol version left");
                            CascadeState::Failed
                        }
                    };
                    trail.push(state);
                    failures.push((version, err));
                }
            }
        }

        Err(failures
            .pop()
            .map(|(_, err)| err)
            .unwrap_or_else(|| FetchError::Config("no protocol versions configured".to_string())))
    }
}
