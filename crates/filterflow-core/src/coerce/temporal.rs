//! Temporal recognition and cross-conversion helpers.

use crate::{schema::FieldKind, value::Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;

// Cheap gate applied before attempting any temporal parse, so ordinary
// strings never pay for format trials: ISO-ish dates, date-times with an
// optional zone, or a bare time of day.
static DATE_OR_TIME_GATE: OnceLock<Option<Regex>> = OnceLock::new();

const DATE_OR_TIME_PATTERN: &str = r"(?i)^((\d{4}[-/]\d{2}[-/]\d{2}|\d{2}-\d{2}-\d{4})([T ]\d{2}:\d{2}(:\d{2}(\.\d{1,9})?)?(Z|[+-]\d{2}:\d{2})?)?|\d{2}:\d{2}(:\d{2}(\.\d{1,9})?)?)$";

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// True when a string plausibly denotes a date, date-time, or time.
#[must_use]
pub fn looks_temporal(input: &str) -> bool {
    DATE_OR_TIME_GATE
        .get_or_init(|| Regex::new(DATE_OR_TIME_PATTERN).ok())
        .as_ref()
        .is_some_and(|gate| gate.is_match(input.trim()))
}

#[must_use]
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

#[must_use]
pub fn parse_time(input: &str) -> Option<NaiveTime> {
    let s = input.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}

#[must_use]
pub fn parse_date_time(input: &str) -> Option<NaiveDateTime> {
    let s = input.trim();
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
        // Date-only strings widen to start-of-day.
        .or_else(|| parse_date(s).map(|d| d.and_time(NaiveTime::MIN)))
}

#[must_use]
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Some(dt) = parse_date_time(s) {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Some(d) = parse_date(s) {
        return Some(Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)));
    }
    // Bare times anchor to the epoch date so they stay mutually comparable.
    parse_time(s).map(|t| Utc.from_utc_datetime(&epoch_date().and_time(t)))
}

/// Parse a gated string into the requested temporal kind.
#[must_use]
pub fn parse_to_kind(input: &str, target: &FieldKind) -> Option<Value> {
    match target {
        FieldKind::Date => parse_date(input).map(Value::Date),
        FieldKind::Time => parse_time(input).map(Value::Time),
        FieldKind::DateTime => parse_date_time(input).map(Value::DateTime),
        FieldKind::Timestamp => parse_timestamp(input).map(Value::Timestamp),
        _ => None,
    }
}

/// Cross-convert between temporal value kinds: date-times drop or keep their
/// parts, dates expand at start-of-day, times anchor to the epoch date, and
/// zoned timestamps convert through UTC. Returns None for combinations with
/// no sensible conversion (e.g. time to date).
#[must_use]
pub fn cross_convert(value: &Value, target: &FieldKind) -> Option<Value> {
    match (value, target) {
        (Value::DateTime(dt), FieldKind::Date) => Some(Value::Date(dt.date())),
        (Value::DateTime(dt), FieldKind::Time) => Some(Value::Time(dt.time())),
        (Value::DateTime(dt), FieldKind::Timestamp) => {
            Some(Value::Timestamp(Utc.from_utc_datetime(dt)))
        }
        (Value::Date(d), FieldKind::DateTime) => Some(Value::DateTime(d.and_time(NaiveTime::MIN))),
        (Value::Date(d), FieldKind::Timestamp) => Some(Value::Timestamp(
            Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)),
        )),
        (Value::Time(t), FieldKind::DateTime) => {
            Some(Value::DateTime(epoch_date().and_time(*t)))
        }
        (Value::Time(t), FieldKind::Timestamp) => Some(Value::Timestamp(
            Utc.from_utc_datetime(&epoch_date().and_time(*t)),
        )),
        (Value::Timestamp(ts), FieldKind::DateTime) => Some(Value::DateTime(ts.naive_utc())),
        (Value::Timestamp(ts), FieldKind::Date) => Some(Value::Date(ts.date_naive())),
        (Value::Timestamp(ts), FieldKind::Time) => Some(Value::Time(ts.naive_utc().time())),
        _ => None,
    }
}

fn epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_admits_temporal_shapes() {
        for ok in [
            "2024-03-14",
            "2024/03/14",
            "14-03-2024",
            "2024-03-14T10:15",
            "2024-03-14 10:15:30",
            "2024-03-14T10:15:30.123Z",
            "2024-03-14T10:15:30+08:00",
            "10:15",
            "10:15:30",
        ] {
            assert!(looks_temporal(ok), "expected gate to admit {ok}");
        }
    }

    #[test]
    fn gate_rejects_plain_strings_and_numbers() {
        for bad in ["hello", "123", "2024", "12:345", "2024-3-4"] {
            assert!(!looks_temporal(bad), "expected gate to reject {bad}");
        }
    }

    #[test]
    fn timestamp_parse_layers() {
        assert!(parse_timestamp("2024-03-14T10:15:30Z").is_some());
        assert!(parse_timestamp("2024-03-14T10:15:30").is_some());
        assert!(parse_timestamp("2024-03-14").is_some());
        let from_time = parse_timestamp("10:15:30").unwrap();
        assert_eq!(from_time.date_naive(), epoch_date());
    }

    #[test]
    fn date_only_string_parses_as_midnight_date_time() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        assert_eq!(parse_date_time("2024-03-14"), Some(d.and_time(NaiveTime::MIN)));
        assert_eq!(
            parse_to_kind("2024-03-14", &FieldKind::DateTime),
            Some(Value::DateTime(d.and_time(NaiveTime::MIN)))
        );
    }

    #[test]
    fn date_expands_at_start_of_day() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        let out = cross_convert(&Value::Date(d), &FieldKind::DateTime).unwrap();
        assert_eq!(out, Value::DateTime(d.and_time(NaiveTime::MIN)));
    }

    #[test]
    fn time_has_no_date_form() {
        let t = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        assert!(cross_convert(&Value::Time(t), &FieldKind::Date).is_none());
    }
}
