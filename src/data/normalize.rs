//! Normalization of raw feed entries into typed records.
//!
//! The API does not type its fields, so every value goes through the same
//! parse-or-absent coercion: anything that is not a finite number becomes
//! `None`. Nothing is defaulted to zero here.

use std::fmt;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::debug;

use crate::source::{RawFeedBatch, RawFeedEntry};

/// Offset-carrying formats tried after RFC 3339.
const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
];

/// Formats without an offset; these yield naive timestamps.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Display format used in tables.
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A record timestamp, keeping the source offset when there was one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    /// Timestamp with an explicit UTC offset.
    Zoned(DateTime<FixedOffset>),
    /// Wall-clock timestamp without an offset, read as local time.
    Naive(NaiveDateTime),
}

impl Timestamp {
    /// Parse a timestamp string, returning `None` when no known format fits.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(Timestamp::Zoned(dt));
        }
        for format in ZONED_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(raw, format) {
                return Some(Timestamp::Zoned(dt));
            }
        }
        for format in NAIVE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(Timestamp::Naive(dt));
            }
        }
        None
    }

    /// The instant this timestamp denotes.
    ///
    /// Naive timestamps are interpreted in the local time zone; a local time
    /// that does not exist (DST gap) falls back to UTC.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            Timestamp::Zoned(dt) => dt.with_timezone(&Utc),
            Timestamp::Naive(naive) => Local
                .from_local_datetime(naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| naive.and_utc()),
        }
    }

    /// Fractional hours elapsed between this timestamp and `now`.
    ///
    /// Negative when the timestamp lies in the future.
    pub fn hours_before(&self, now: DateTime<Utc>) -> f64 {
        (now - self.to_utc()).num_milliseconds() as f64 / 3_600_000.0
    }

    /// Wall-clock rendering in the timestamp's own offset.
    pub fn display(&self) -> String {
        match self {
            Timestamp::Zoned(dt) => dt.format(DISPLAY_FORMAT).to_string(),
            Timestamp::Naive(naive) => naive.format(DISPLAY_FORMAT).to_string(),
        }
    }

    /// Lossless rendering that [`Timestamp::parse`] reads back.
    pub fn to_export_string(&self) -> String {
        match self {
            Timestamp::Zoned(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            Timestamp::Naive(naive) => naive.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_export_string())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_export_string())
    }
}

/// A normalized feed entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub timestamp: Timestamp,
    pub entry_id: Option<u64>,
    /// Soil moisture in percent (field1).
    pub moisture: Option<f64>,
    /// Raw ADC reading (field2).
    pub adc: Option<f64>,
    /// Battery voltage in volts (field3).
    pub battery_voltage: Option<f64>,
    /// Device status code (field4).
    pub status_code: Option<i64>,
    /// Unassigned numeric fields field5..field7.
    pub aux: [Option<f64>; 3],
    /// Decoded free-text log line (field8), empty when absent.
    pub signal_text: String,
}

/// Convert a raw batch into records, preserving order.
///
/// Entries whose timestamp cannot be parsed are dropped. An empty or
/// missing feed list yields an empty vector.
pub fn normalize(batch: &RawFeedBatch) -> Vec<Record> {
    batch.entries().iter().filter_map(normalize_entry).collect()
}

/// Normalize a single entry, or `None` when its timestamp is unusable.
pub fn normalize_entry(entry: &RawFeedEntry) -> Option<Record> {
    let timestamp = entry.created_at.as_ref().and_then(Value::as_str).and_then(Timestamp::parse);
    let Some(timestamp) = timestamp else {
        debug!(created_at = ?entry.created_at, entry_id = ?entry.entry_id, "dropping entry with unparseable timestamp");
        return None;
    };

    Some(Record {
        timestamp,
        entry_id: parse_entry_id(entry.entry_id.as_ref()),
        moisture: parse_or_absent(entry.field1.as_ref()),
        adc: parse_or_absent(entry.field2.as_ref()),
        battery_voltage: parse_or_absent(entry.field3.as_ref()),
        status_code: parse_code(entry.field4.as_ref()),
        aux: [
            parse_or_absent(entry.field5.as_ref()),
            parse_or_absent(entry.field6.as_ref()),
            parse_or_absent(entry.field7.as_ref()),
        ],
        signal_text: decode_text(entry.field8.as_ref()),
    })
}

/// Coerce a loosely typed value to a finite float, or absent.
pub fn parse_or_absent(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_number(s)?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Parse a numeric string cell, or absent.
pub fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Coerce a value to an integral status code, or absent.
pub fn parse_code(value: Option<&Value>) -> Option<i64> {
    parse_or_absent(value).and_then(integral)
}

pub(crate) fn integral(n: f64) -> Option<i64> {
    (n.fract() == 0.0 && n.abs() < i64::MAX as f64).then_some(n as i64)
}

fn parse_entry_id(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Decode the free-text field: `+` becomes a space, then percent escapes
/// are decoded. Absent or empty values decode to an empty string.
pub fn decode_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => decode_plus(s),
        Some(other) => decode_plus(&other.to_string()),
    }
}

fn decode_plus(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    let spaced = s.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn entry(created_at: &str, field1: Option<Value>) -> RawFeedEntry {
        RawFeedEntry {
            created_at: Some(Value::String(created_at.to_string())),
            field1,
            ..Default::default()
        }
    }

    fn batch(entries: Vec<RawFeedEntry>) -> RawFeedBatch {
        RawFeedBatch {
            channel: None,
            feeds: Some(entries),
        }
    }

    #[test]
    fn test_empty_and_missing_feed() {
        assert!(normalize(&RawFeedBatch::default()).is_empty());
        assert!(normalize(&batch(Vec::new())).is_empty());
    }

    #[test]
    fn test_drops_unparseable_timestamps_in_order() {
        let entries = vec![
            entry("2024-05-01T10:00:00Z", Some(Value::from(1.0))),
            entry("yesterday", Some(Value::from(2.0))),
            entry("2024-05-01T11:00:00Z", Some(Value::from(3.0))),
            entry("", Some(Value::from(4.0))),
            entry("2024-05-01T12:00:00Z", Some(Value::from(5.0))),
        ];

        let records = normalize(&batch(entries));
        let moisture: Vec<_> = records.iter().map(|r| r.moisture).collect();
        assert_eq!(moisture, vec![Some(1.0), Some(3.0), Some(5.0)]);
    }

    #[test]
    fn test_missing_created_at_is_dropped() {
        let entries = vec![RawFeedEntry {
            field1: Some(Value::from("12")),
            ..Default::default()
        }];
        assert!(normalize(&batch(entries)).is_empty());
    }

    #[test]
    fn test_moisture_coercion() {
        let entries = vec![
            entry("2024-05-01T10:00:00Z", Some(Value::from("23.5"))),
            entry("2024-05-01T11:00:00Z", Some(Value::from("abc"))),
            entry("2024-05-01T12:00:00Z", None),
        ];

        let records = normalize(&batch(entries));
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].moisture, Some(23.5));
        assert_eq!(records[1].moisture, None);
        assert_eq!(records[2].moisture, None);
    }

    #[test]
    fn test_parse_or_absent() {
        assert_eq!(parse_or_absent(Some(&Value::from(" 3.71 "))), Some(3.71));
        assert_eq!(parse_or_absent(Some(&Value::from(512))), Some(512.0));
        assert_eq!(parse_or_absent(Some(&Value::from(""))), None);
        assert_eq!(parse_or_absent(Some(&Value::from("NaN"))), None);
        assert_eq!(parse_or_absent(Some(&Value::from("inf"))), None);
        assert_eq!(parse_or_absent(Some(&Value::Bool(true))), None);
        assert_eq!(parse_or_absent(Some(&Value::Null)), None);
        assert_eq!(parse_or_absent(None), None);
    }

    #[test]
    fn test_status_code_must_be_integral() {
        assert_eq!(parse_code(Some(&Value::from("4"))), Some(4));
        assert_eq!(parse_code(Some(&Value::from("2.0"))), Some(2));
        assert_eq!(parse_code(Some(&Value::from("1.5"))), None);
        assert_eq!(parse_code(Some(&Value::from("ok"))), None);
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(
            decode_text(Some(&Value::from("WiFi+connected.+Signal%3A+-67+dBm"))),
            "WiFi connected. Signal: -67 dBm"
        );
        assert_eq!(decode_text(Some(&Value::from("100%25+done"))), "100% done");
        assert_eq!(decode_text(Some(&Value::from("a%2Bb"))), "a+b");
        assert_eq!(decode_text(Some(&Value::from("bad%zzescape"))), "bad%zzescape");
        assert_eq!(decode_text(Some(&Value::from(""))), "");
        assert_eq!(decode_text(Some(&Value::Null)), "");
        assert_eq!(decode_text(None), "");
    }

    #[test]
    fn test_all_fields() {
        let raw = RawFeedEntry {
            created_at: Some(Value::from("2024-05-01T10:00:00+02:00")),
            entry_id: Some(Value::from(17)),
            field1: Some(Value::from("41.2")),
            field2: Some(Value::from("1873")),
            field3: Some(Value::from("3.92")),
            field4: Some(Value::from("1")),
            field5: Some(Value::from("7")),
            field6: None,
            field7: Some(Value::from("x")),
            field8: Some(Value::from("Upload+retry")),
        };

        let record = normalize_entry(&raw).unwrap();
        assert_eq!(record.entry_id, Some(17));
        assert_eq!(record.adc, Some(1873.0));
        assert_eq!(record.battery_voltage, Some(3.92));
        assert_eq!(record.status_code, Some(1));
        assert_eq!(record.aux, [Some(7.0), None, None]);
        assert_eq!(record.signal_text, "Upload retry");
        assert_eq!(record.timestamp.to_utc().hour(), 8);
    }

    #[test]
    fn test_timestamp_formats() {
        assert!(matches!(
            Timestamp::parse("2024-05-01T10:00:00Z"),
            Some(Timestamp::Zoned(_))
        ));
        assert!(matches!(
            Timestamp::parse("2024-05-01 10:00:00 +0200"),
            Some(Timestamp::Zoned(_))
        ));
        assert!(matches!(
            Timestamp::parse("2024-05-01 10:00:00"),
            Some(Timestamp::Naive(_))
        ));
        assert!(matches!(
            Timestamp::parse("2024-05-01T10:00:00.250"),
            Some(Timestamp::Naive(_))
        ));
        assert!(Timestamp::parse("05/01/2024").is_none());
    }

    #[test]
    fn test_timestamp_export_round_trip() {
        for raw in ["2024-05-01T10:00:00Z", "2024-05-01T10:00:00+02:00", "2024-05-01 10:00:00"] {
            let ts = Timestamp::parse(raw).unwrap();
            assert_eq!(Timestamp::parse(&ts.to_export_string()), Some(ts));
        }
        let ts = Timestamp::parse("2024-05-01T10:00:00Z").unwrap();
        assert_eq!(ts.to_export_string(), "2024-05-01T10:00:00Z");
        assert_eq!(ts.display(), "2024-05-01 10:00:00");
    }
}
