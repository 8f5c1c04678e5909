//! Subscription keys.

use std::fmt;

/// Identifier of the logical metrics stream being polled.
///
/// Changing the active experiment restarts polling and starts a fresh stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ExperimentId(String);

impl ExperimentId {
    /// Create an experiment id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExperimentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ExperimentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ExperimentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
