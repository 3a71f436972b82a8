//! Lenient timestamp handling
//!
//! Imported files carry dates as RFC 3339 strings, plain dates, naive
//! date-times or epoch milliseconds. Everything is normalised to
//! `DateTime<Utc>` and written back as RFC 3339 with millisecond precision.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, TimeZone, Utc};
use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
use serde_json::Value;

/// Current time at the precision timestamps are written with
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Parse a date-like JSON value into a UTC timestamp
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

/// Parse a date-like string into a UTC timestamp
pub fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Format a timestamp the way every writer in the crate does
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serde adapter for required timestamps
pub mod lenient {
    use super::*;

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_timestamp(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let value = Value::deserialize(d)?;
        parse_timestamp(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", value)))
    }
}

/// Serde adapter for optional timestamps
pub mod lenient_option {
    use super::*;

    pub fn serialize<S: Serializer>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => s.serialize_some(&format_timestamp(dt)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let value = Value::deserialize(d)?;
        if value.is_null() {
            return Ok(None);
        }
        parse_timestamp(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use serde_json::json;

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_timestamp(&json!("2024-05-01T10:30:00.000Z")).unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 5);
    }

    #[test]
    fn test_parse_plain_date_and_millis() {
        let dt = parse_timestamp(&json!("2023-12-24")).unwrap();
        assert_eq!(dt.day(), 24);

        let dt = parse_timestamp(&json!(0)).unwrap();
        assert_eq!(dt.year(), 1970);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_timestamp(&json!("yesterday")).is_none());
        assert!(parse_timestamp(&json!(true)).is_none());
        assert!(parse_timestamp(&json!(null)).is_none());
    }

    #[test]
    fn test_format_round_trip() {
        let dt = parse_timestamp(&json!("2024-05-01T10:30:00.250Z")).unwrap();
        let formatted = format_timestamp(&dt);
        assert_eq!(formatted, "2024-05-01T10:30:00.250Z");
        assert_eq!(parse_timestamp_str(&formatted), Some(dt));
    }

    #[test]
    fn test_now_survives_formatting() {
        let stamp = now();
        assert_eq!(parse_timestamp_str(&format_timestamp(&stamp)), Some(stamp));
    }
}
