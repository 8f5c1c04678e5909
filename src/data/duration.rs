//! Human-friendly durations for configuration values and status text.

use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Suffix to nanoseconds multiplier. Two-letter suffixes first so `ms` wins over `s`.
const UNITS: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("µs", 1e3),
    ("us", 1e3),
    ("ms", 1e6),
    ("s", 1e9),
    ("m", 6e10),
];

/// Parse `"3s"`, `"500ms"`, `"1.5m"` or a bare number of milliseconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        bail!("empty duration");
    }

    let (number, multiplier) = UNITS
        .iter()
        .find_map(|(suffix, mult)| s.strip_suffix(suffix).map(|n| (n.trim(), *mult)))
        .unwrap_or((s, 1e6));

    let value: f64 = number
        .parse()
        .with_context(|| format!("invalid duration: {s:?}"))?;
    if !value.is_finite() || value < 0.0 {
        bail!("duration out of range: {s:?}");
    }

    Ok(Duration::from_nanos((value * multiplier).round() as u64))
}

/// Format an age in milliseconds for status text: `850ms`, `4.2s`, `3m 12s`.
pub fn format_age(ms: u64) -> String {
    if ms < 1_000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1_000.0)
    } else {
        let secs = ms / 1_000;
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_with_suffixes() {
        assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("1.5m").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration(" 250 us ").unwrap(), Duration::from_micros(250));
    }

    #[test]
    fn bare_number_is_milliseconds() {
        assert_eq!(parse_duration("3000").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("-1s").is_err());
        assert!(parse_duration("infs").is_err());
    }

    #[test]
    fn format_ages() {
        assert_eq!(format_age(850), "850ms");
        assert_eq!(format_age(4_200), "4.2s");
        assert_eq!(format_age(192_000), "3m 12s");
    }
}
