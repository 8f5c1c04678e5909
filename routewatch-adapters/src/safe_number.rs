//! Coercion of decoded JSON values into finite numbers.
//!
//! The dashboard API is loosely typed: numbers may arrive as strings, be
//! missing, or be `null`. Every numeric field is passed through [`sanitize`]
//! at the ingestion boundary so the rest of routewatch only ever sees finite
//! values. A malformed field becomes `0`; it never rejects the whole sample.

use serde_json::{Map, Value};

/// Convert an arbitrary JSON value to a finite number, or `0`.
///
/// Numbers pass through, numeric strings are parsed (an empty string is `0`),
/// booleans become `1`/`0`, and everything else is `0`. NaN and infinities,
/// including ones spelled out in strings, are `0`.
pub fn sanitize(raw: &Value) -> f64 {
    let n = match raw {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_numeric(s),
        Value::Bool(true) => 1.0,
        Value::Bool(false) | Value::Null | Value::Array(_) | Value::Object(_) => 0.0,
    };
    sanitize_f64(n)
}

/// Sanitize a value that may be absent.
pub fn sanitize_opt(raw: Option<&Value>) -> f64 {
    raw.map_or(0.0, sanitize)
}

/// Sanitize the field `key` of a JSON object. Missing fields are `0`.
pub fn sanitize_field(object: &Map<String, Value>, key: &str) -> f64 {
    sanitize_opt(object.get(key))
}

/// Replace NaN and infinities with `0`.
pub fn sanitize_f64(n: f64) -> f64 {
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// Sanitize a count: negative and fractional parts are dropped.
pub fn sanitize_count(raw: &Value) -> u64 {
    let n = sanitize(raw);
    if n <= 0.0 {
        0
    } else {
        n as u64
    }
}

fn parse_numeric(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed.parse::<f64>().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_finite_inputs_become_zero() {
        assert_eq!(sanitize_f64(f64::NAN), 0.0);
        assert_eq!(sanitize_f64(f64::INFINITY), 0.0);
        assert_eq!(sanitize_f64(f64::NEG_INFINITY), 0.0);
        assert_eq!(sanitize_opt(None), 0.0);
    }

    #[test]
    fn finite_numbers_pass_through() {
        assert_eq!(sanitize(&json!(3.5)), 3.5);
        assert_eq!(sanitize(&json!(-2)), -2.0);
        assert_eq!(sanitize_f64(3.5), 3.5);
    }

    #[test]
    fn strings_are_parsed() {
        assert_eq!(sanitize(&json!("42")), 42.0);
        assert_eq!(sanitize(&json!(" 1.5 ")), 1.5);
        assert_eq!(sanitize(&json!("")), 0.0);
        assert_eq!(sanitize(&json!("fast")), 0.0);
        assert_eq!(sanitize(&json!("NaN")), 0.0);
        assert_eq!(sanitize(&json!("Infinity")), 0.0);
    }

    #[test]
    fn other_json_types() {
        assert_eq!(sanitize(&json!(true)), 1.0);
        assert_eq!(sanitize(&json!(false)), 0.0);
        assert_eq!(sanitize(&Value::Null), 0.0);
        assert_eq!(sanitize(&json!([1, 2])), 0.0);
        assert_eq!(sanitize(&json!({"a": 1})), 0.0);
    }

    #[test]
    fn missing_field_is_zero() {
        let object = json!({"p95": 120}).as_object().cloned().unwrap();
        assert_eq!(sanitize_field(&object, "p95"), 120.0);
        assert_eq!(sanitize_field(&object, "qps"), 0.0);
    }

    #[test]
    fn counts_are_non_negative_integers() {
        assert_eq!(sanitize_count(&json!(12)), 12);
        assert_eq!(sanitize_count(&json!(2.9)), 2);
        assert_eq!(sanitize_count(&json!(-4)), 0);
        assert_eq!(sanitize_count(&json!("x")), 0);
    }
}
