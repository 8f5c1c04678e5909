//! Protocol versions of the agent summary source.

use std::fmt;

/// A protocol version of a versioned data source.
///
/// Higher numbers are preferred; lower ones serve as fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ProtocolVersion(u8);

impl ProtocolVersion {
    /// Legacy summary protocol.
    pub const V2: Self = Self(2);

    /// Current summary protocol.
    pub const V3: Self = Self(3);

    /// Versions in priority order, highest first.
    pub const PRIORITY: [Self; 2] = [Self::V3, Self::V2];

    /// Create a version from its number.
    pub const fn new(number: u8) -> Self {
        Self(number)
    }

    /// The version number as used in `?v=` query parameters.
    pub const fn number(self) -> u8 {
        self.0
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::V3
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<u8> for ProtocolVersion {
    fn from(number: u8) -> Self {
        Self(number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_is_descending() {
        assert_eq!(ProtocolVersion::PRIORITY, [ProtocolVersion::V3, ProtocolVersion::V2]);
        assert!(ProtocolVersion::V3 > ProtocolVersion::V2);
    }

    #[test]
    fn display_uses_v_prefix() {
        assert_eq!(ProtocolVersion::V2.to_string(), "v2");
        assert_eq!(ProtocolVersion::default(), ProtocolVersion::V3);
    }
}
