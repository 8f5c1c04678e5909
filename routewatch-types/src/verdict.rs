//! Agent verdicts.

use std::fmt;

use crate::ProtocolVersion;

/// Categorical health judgment produced by the evaluation agent.
///
/// Unknown verdict strings are preserved verbatim in [`Verdict::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "String", into = "String"))]
pub enum Verdict {
    Pass,
    Edge,
    Fail,
    Other(String),
}

impl Verdict {
    /// Parse a verdict label, ignoring case and surrounding whitespace.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "PASS" => Verdict::Pass,
            "EDGE" => Verdict::Edge,
            "FAIL" => Verdict::Fail,
            _ => Verdict::Other(trimmed.to_string()),
        }
    }

    /// Display label (`PASS`, `EDGE`, `FAIL` or the raw string).
    pub fn as_str(&self) -> &str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Edge => "EDGE",
            Verdict::Fail => "FAIL",
            Verdict::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Verdict {
    fn from(raw: String) -> Self {
        Verdict::parse(&raw)
    }
}

impl From<Verdict> for String {
    fn from(verdict: Verdict) -> Self {
        verdict.as_str().to_string()
    }
}

/// The agent's latest summary, replaced wholesale on every successful fetch.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentVerdict {
    /// The categorical verdict.
    pub verdict: Verdict,

    /// Explanatory bullets, in the order the agent produced them.
    pub bullets: Vec<String>,

    /// Explainer mode label reported by the agent.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub mode: Option<String>,

    /// Whether the agent served a cached result.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub cached: Option<bool>,

    /// Generation timestamp as reported by the agent.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub generated_at: Option<String>,

    /// The protocol version that actually produced this verdict.
    pub version: ProtocolVersion,

    /// The protocol version that was asked for.
    pub requested: ProtocolVersion,
}

impl AgentVerdict {
    /// Returns true if the verdict came from a lower version than requested.
    pub fn is_fallback(&self) -> bool {
        self.version != self.requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_verdicts() {
        assert_eq!(Verdict::parse("PASS"), Verdict::Pass);
        assert_eq!(Verdict::parse(" edge "), Verdict::Edge);
        assert_eq!(Verdict::parse("Fail"), Verdict::Fail);
    }

    #[test]
    fn unknown_verdict_keeps_raw_text() {
        let verdict = Verdict::parse("INCONCLUSIVE");
        assert_eq!(verdict, Verdict::Other("INCONCLUSIVE".to_string()));
        assert_eq!(verdict.to_string(), "INCONCLUSIVE");
    }

    #[test]
    fn fallback_is_reported() {
        let verdict = AgentVerdict {
            verdict: Verdict::Pass,
            bullets: vec!["ok".to_string()],
            mode: None,
            cached: None,
            generated_at: None,
            version: ProtocolVersion::V2,
            requested: ProtocolVersion::V3,
        };
        assert!(verdict.is_fallback());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn verdict_serializes_as_label() {
        let json = serde_json::to_string(&Verdict::Edge).unwrap();
        assert_eq!(json, "\"EDGE\"");
        let back: Verdict = serde_json::from_str("\"pass\"").unwrap();
        assert_eq!(back, Verdict::Pass);
    }
}
