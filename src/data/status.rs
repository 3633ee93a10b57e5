//! Status evaluation over normalized records.
//!
//! Freshness is classified from the latest timestamp against an expected
//! reporting interval. Per-record signals (attempt count, WiFi strength)
//! are derived from the status code and the decoded log text.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::normalize::Record;

/// Default expected interval between device reports, in hours.
pub const DEFAULT_INTERVAL_HOURS: f64 = 3.0;

/// Grace period added to the interval before an update counts as overdue.
const OVERDUE_GRACE_HOURS: f64 = 0.5;

/// Message used when there is nothing to classify.
pub const NO_DATA_MESSAGE: &str = "no data available";

/// Freshness classification of the latest update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Normal,
    Overdue,
    Missed,
}

impl Freshness {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            Freshness::Normal => "OK",
            Freshness::Overdue => "LATE",
            Freshness::Missed => "MISSED",
        }
    }
}

/// Result of a freshness check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FreshnessStatus {
    pub state: Freshness,
    pub message: String,
    /// Hours since the latest update; `None` when there is no data.
    pub hours_since: Option<f64>,
    /// Hours until the next expected update; only set when `Normal`.
    pub next_expected_in: Option<f64>,
}

/// Classify freshness against the current time.
pub fn classify_freshness(records: &[Record], expected_interval_hours: f64) -> FreshnessStatus {
    classify_freshness_at(records, expected_interval_hours, Utc::now())
}

/// Classify freshness against a fixed clock.
///
/// Missed is checked before Overdue and both boundaries are inclusive, so
/// exactly `2 * interval` hours counts as Missed and exactly
/// `interval + 0.5` hours counts as Overdue.
pub fn classify_freshness_at(
    records: &[Record],
    expected_interval_hours: f64,
    now: DateTime<Utc>,
) -> FreshnessStatus {
    let Some(latest) = latest(records) else {
        return FreshnessStatus {
            state: Freshness::Missed,
            message: NO_DATA_MESSAGE.to_string(),
            hours_since: None,
            next_expected_in: None,
        };
    };

    let hours_since = latest.timestamp.hours_before(now);
    let interval = expected_interval_hours;

    if hours_since >= interval * 2.0 {
        FreshnessStatus {
            state: Freshness::Missed,
            message: format!(
                "MISSED UPDATE! Last update was {:.1} hours ago (expected every {}h)",
                hours_since,
                format_hours(interval)
            ),
            hours_since: Some(hours_since),
            next_expected_in: None,
        }
    } else if hours_since >= interval + OVERDUE_GRACE_HOURS {
        FreshnessStatus {
            state: Freshness::Overdue,
            message: format!(
                "Update overdue: {:.1} hours ago (next expected soon)",
                hours_since
            ),
            hours_since: Some(hours_since),
            next_expected_in: None,
        }
    } else {
        let next = interval - hours_since;
        FreshnessStatus {
            state: Freshness::Normal,
            message: format!(
                "Status normal: last update {:.1}h ago (next in {:.1}h)",
                hours_since, next
            ),
            hours_since: Some(hours_since),
            next_expected_in: Some(next),
        }
    }
}

/// The record with the most recent timestamp.
pub fn latest(records: &[Record]) -> Option<&Record> {
    records.iter().max_by_key(|r| r.timestamp.to_utc())
}

/// Format an interval without a trailing `.0` for whole hours.
fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{:.0}", hours)
    } else {
        format!("{}", hours)
    }
}

/// Display class of a record's connection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptClass {
    /// The device needed a second attempt.
    Retry,
    /// First attempt succeeded.
    Normal,
    /// No status code reported.
    Unknown,
}

impl AttemptClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptClass::Retry => "retry",
            AttemptClass::Normal => "normal",
            AttemptClass::Unknown => "unknown",
        }
    }
}

/// Attempt count and status label derived from a status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptInfo {
    pub count: u8,
    pub label: String,
    pub class: AttemptClass,
}

/// Derive attempt count, label and class from a status code.
pub fn derive_attempts(status_code: Option<i64>) -> AttemptInfo {
    match status_code {
        Some(code @ (1 | 2)) => AttemptInfo {
            count: 2,
            label: status_label(Some(code)),
            class: AttemptClass::Retry,
        },
        Some(code) => AttemptInfo {
            count: 1,
            label: status_label(Some(code)),
            class: AttemptClass::Normal,
        },
        None => AttemptInfo {
            count: 1,
            label: status_label(None),
            class: AttemptClass::Unknown,
        },
    }
}

/// Human-readable label for a status code.
pub fn status_label(status_code: Option<i64>) -> String {
    match status_code {
        Some(1) => "Upload Retry Success".to_string(),
        Some(2) => "WiFi Retry Success".to_string(),
        Some(3) => "Low Battery Warning".to_string(),
        Some(4) => "Normal Reading".to_string(),
        Some(code) => format!("Code: {}", code),
        None => "Unknown".to_string(),
    }
}

/// Extract a WiFi signal strength from a log line.
///
/// Matches `Signal:` followed by optional whitespace, an optional minus
/// sign, digits, optional whitespace and `dBm`. The first matching
/// occurrence wins.
pub fn extract_signal_dbm(text: Option<&str>) -> Option<i64> {
    const PREFIX: &str = "Signal:";
    let text = text?;

    let mut rest = text;
    while let Some(pos) = rest.find(PREFIX) {
        let after = &rest[pos + PREFIX.len()..];
        if let Some(value) = match_reading(after) {
            return Some(value);
        }
        rest = after;
    }
    None
}

/// Match `\s*(-?\d+)\s*dBm` at the start of `s`.
fn match_reading(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, s) = match s.strip_prefix('-') {
        Some(stripped) => (true, stripped),
        None => (false, s),
    };

    let digits_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if digits_end == 0 {
        return None;
    }
    let (digits, tail) = s.split_at(digits_end);
    if !tail.trim_start().starts_with("dBm") {
        return None;
    }

    let value: i64 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Signals derived from one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedSignal {
    pub attempts: AttemptInfo,
    pub signal_dbm: Option<i64>,
}

impl DerivedSignal {
    pub fn from_record(record: &Record) -> Self {
        let text = (!record.signal_text.is_empty()).then_some(record.signal_text.as_str());
        Self {
            attempts: derive_attempts(record.status_code),
            signal_dbm: extract_signal_dbm(text),
        }
    }
}
