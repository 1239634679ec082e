//! Total conversions from loosely-shaped provider payloads.
//!
//! Provider responses are modelled as `serde_json::Value`. Numbers may arrive
//! as JSON numbers, numeric strings, or Yahoo-style `{ "raw": .., "fmt": .. }`
//! wrappers. None of these helpers panic; anything unusable becomes `None`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::SnapshotError;

fn is_nan_text(s: &str) -> bool {
    let t = s.trim();
    t.eq_ignore_ascii_case("nan") || t.eq_ignore_ascii_case("null") || t.is_empty()
}

/// Look up `key` in a mapping. Missing keys, nulls and NaN placeholders are
/// all reported as absent. Non-mapping inputs yield `None`.
pub fn safe_get<'a>(map: &'a Value, key: &str) -> Option<&'a Value> {
    let v = map.as_object()?.get(key)?;
    match v {
        Value::Null => None,
        Value::String(s) if is_nan_text(s) => None,
        _ => Some(v),
    }
}

/// Walk a chain of keys with [`safe_get`] semantics at every level.
pub fn get_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, key| safe_get(node, key))
}

/// Convert to a finite float.
pub fn as_float(x: &Value) -> Option<f64> {
    let n = match x {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !is_nan_text(s) => s.trim().parse::<f64>().ok(),
        Value::Object(_) => safe_get(x, "raw").and_then(as_float),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Convert to an integer, flooring fractional values.
pub fn as_int(x: &Value) -> Option<i64> {
    let n = as_float(x)?.floor();
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound.
    if n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Some(n as i64)
    } else {
        None
    }
}

/// Non-empty trimmed text.
pub fn as_text(x: &Value) -> Option<String> {
    match x {
        Value::String(s) if !is_nan_text(s) => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Parse one of the three date encodings providers use: epoch seconds,
/// an ISO-8601 string, or a nested `{ "raw": .. }` wrapper around either.
pub fn try_parse_calendar_date(x: &Value) -> Result<NaiveDate, SnapshotError> {
    match x {
        Value::Number(n) => {
            let secs = n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i64))
                .ok_or_else(|| SnapshotError::ParseFailed(format!("epoch out of range: {}", n)))?;
            DateTime::<Utc>::from_timestamp(secs, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| SnapshotError::ParseFailed(format!("epoch out of range: {}", secs)))
        }
        Value::String(s) => parse_iso_date(s.trim())
            .ok_or_else(|| SnapshotError::ParseFailed(format!("unrecognised date: {:?}", s))),
        Value::Object(_) => {
            if let Some(raw) = safe_get(x, "raw") {
                if let Ok(date) = try_parse_calendar_date(raw) {
                    return Ok(date);
                }
            }
            match safe_get(x, "fmt") {
                Some(fmt @ Value::String(_)) => try_parse_calendar_date(fmt),
                _ => Err(SnapshotError::ParseFailed("date wrapper without usable raw/fmt".to_string())),
            }
        }
        other => Err(SnapshotError::ParseFailed(format!("not a date: {}", other))),
    }
}

/// [`try_parse_calendar_date`] with the failure folded into absence.
pub fn parse_calendar_date(x: &Value) -> Option<NaiveDate> {
    match try_parse_calendar_date(x) {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::debug!("Treating date as absent: {}", e);
            None
        }
    }
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    // "2024-05-01 13:30:00" and similar: trust the leading calendar date.
    s.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_safe_get_absent_cases() {
        let m = json!({"a": null, "b": "NaN", "c": 3, "d": ""});
        assert!(safe_get(&m, "a").is_none());
        assert!(safe_get(&m, "b").is_none());
        assert!(safe_get(&m, "missing").is_none());
        assert!(safe_get(&m, "d").is_none());
        assert_eq!(safe_get(&m, "c"), Some(&json!(3)));
        assert!(safe_get(&json!([1, 2]), "a").is_none());
        assert!(safe_get(&Value::Null, "a").is_none());
    }

    #[test]
    fn test_as_float_shapes() {
        assert_eq!(as_float(&json!(1.5)), Some(1.5));
        assert_eq!(as_float(&json!("2.25")), Some(2.25));
        assert_eq!(as_float(&json!({"raw": 7, "fmt": "7.00"})), Some(7.0));
        assert_eq!(as_float(&json!("NaN")), None);
        assert_eq!(as_float(&json!("inf")), None);
        assert_eq!(as_float(&json!("-Infinity")), None);
        assert_eq!(as_float(&json!("12abc")), None);
        assert_eq!(as_float(&json!(true)), None);
        assert_eq!(as_float(&json!([1])), None);
        assert_eq!(as_float(&Value::Null), None);
        assert_eq!(as_float(&json!({})), None);
    }

    #[test]
    fn test_as_int_floors() {
        assert_eq!(as_int(&json!(10.9)), Some(10));
        assert_eq!(as_int(&json!(-1.5)), Some(-2));
        assert_eq!(as_int(&json!("15000000")), Some(15_000_000));
        assert_eq!(as_int(&json!(1e300)), None);
        assert_eq!(as_int(&json!("nan")), None);
    }

    #[test]
    fn test_coercion_never_yields_non_finite() {
        let inputs = [
            json!(null), json!("NaN"), json!("inf"), json!(-0.0), json!(f64::MAX),
            json!({"raw": "NaN"}), json!({"raw": {"raw": 3}}), json!("  42  "), json!("1e400"),
        ];
        for input in &inputs {
            if let Some(f) = as_float(input) {
                assert!(f.is_finite(), "{:?} produced {}", input, f);
            }
            let _ = as_int(input);
        }
    }

    #[test]
    fn test_get_path() {
        let v = json!({"earnings": {"earningsDate": [{"raw": 1714521600}], "earningsAverage": null}});
        assert!(get_path(&v, &["earnings", "earningsDate"]).is_some());
        assert!(get_path(&v, &["earnings", "earningsAverage"]).is_none());
        assert!(get_path(&v, &["nope", "x"]).is_none());
    }

    #[test]
    fn test_calendar_date_encodings() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(parse_calendar_date(&json!(1714521600)), Some(expected));
        assert_eq!(parse_calendar_date(&json!("2024-05-01")), Some(expected));
        assert_eq!(parse_calendar_date(&json!("2024-05-01T00:00:00.000Z")), Some(expected));
        assert_eq!(parse_calendar_date(&json!({"raw": 1714521600, "fmt": "2024-05-01"})), Some(expected));
        assert_eq!(parse_calendar_date(&json!({"fmt": "2024-05-01"})), Some(expected));
    }

    #[test]
    fn test_calendar_date_unparsable() {
        assert_eq!(parse_calendar_date(&json!("next tuesday")), None);
        assert_eq!(parse_calendar_date(&json!({"raw": "garbage"})), None);
        assert_eq!(parse_calendar_date(&json!([1714521600])), None);
        assert!(matches!(
            try_parse_calendar_date(&json!("2024-13-45")),
            Err(SnapshotError::ParseFailed(_))
        ));
    }
}
