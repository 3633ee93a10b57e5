//! CSV and JSON export of normalized feed data.
//!
//! The CSV table has one row per record. Absent values are written as
//! empty cells so a table can be read back with [`parse_csv`] without
//! turning gaps into zeros.

use std::io::{self, Write};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::debug;

use super::dashboard::DashboardData;
use super::normalize::{integral, parse_number, Record, Timestamp};
use super::stats::FeedStats;
use super::status::{derive_attempts, extract_signal_dbm, DerivedSignal, FreshnessStatus};
use crate::error::TableError;
use crate::source::ChannelInfo;

/// Column names, in order.
pub const CSV_HEADER: [&str; 12] = [
    "created_at",
    "entry_id",
    "moisture",
    "adc",
    "battery_voltage",
    "status_code",
    "status",
    "field5",
    "field6",
    "field7",
    "signal_dbm",
    "log_message",
];

/// Write records as a CSV table, header first.
pub fn write_csv<W: Write>(records: &[Record], mut writer: W) -> io::Result<()> {
    writeln!(writer, "{}", CSV_HEADER.join(","))?;

    for record in records {
        let text = (!record.signal_text.is_empty()).then_some(record.signal_text.as_str());
        let cells = [
            record.timestamp.to_export_string(),
            opt_cell(record.entry_id),
            opt_cell(record.moisture),
            opt_cell(record.adc),
            opt_cell(record.battery_voltage),
            opt_cell(record.status_code),
            derive_attempts(record.status_code).label,
            opt_cell(record.aux[0]),
            opt_cell(record.aux[1]),
            opt_cell(record.aux[2]),
            opt_cell(extract_signal_dbm(text)),
            record.signal_text.clone(),
        ];
        let line: Vec<String> = cells.iter().map(|c| quote(c)).collect();
        writeln!(writer, "{}", line.join(","))?;
    }

    writer.flush()
}

/// Render records as a CSV string.
pub fn to_csv_string(records: &[Record]) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_csv(records, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Read a table produced by [`write_csv`] back into records.
///
/// Derived columns (`status`, `signal_dbm`) are ignored. Blank lines are
/// skipped. Rows with an unparseable timestamp are dropped, matching the
/// normalizer.
pub fn parse_csv(text: &str) -> Result<Vec<Record>, TableError> {
    let mut rows = split_rows(text)?
        .into_iter()
        .enumerate()
        .filter(|(_, row)| !is_blank_row(row));

    let (_, header) = rows.next().ok_or_else(|| TableError::Header("empty table".to_string()))?;
    if header.iter().map(String::as_str).ne(CSV_HEADER.iter().copied()) {
        return Err(TableError::Header(header.join(",")));
    }

    let mut records = Vec::new();
    for (index, row) in rows {
        if row.len() != CSV_HEADER.len() {
            return Err(TableError::Width {
                row: index,
                expected: CSV_HEADER.len(),
                found: row.len(),
            });
        }

        let Some(timestamp) = Timestamp::parse(&row[0]) else {
            debug!(row = index, created_at = %row[0], "dropping row with unparseable timestamp");
            continue;
        };

        records.push(Record {
            timestamp,
            entry_id: row[1].trim().parse().ok(),
            moisture: parse_number(&row[2]),
            adc: parse_number(&row[3]),
            battery_voltage: parse_number(&row[4]),
            status_code: parse_number(&row[5]).and_then(integral),
            aux: [parse_number(&row[7]), parse_number(&row[8]), parse_number(&row[9])],
            signal_text: row[11].clone(),
        });
    }

    Ok(records)
}

/// Default file name for a CSV export, e.g.
/// `moisture_data_123456_20240501_120000.csv`.
pub fn default_export_name(channel_id: &str, now: DateTime<Local>) -> String {
    format!(
        "moisture_data_{}_{}.csv",
        channel_id,
        now.format("%Y%m%d_%H%M%S")
    )
}

fn opt_cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn quote(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

fn is_blank_row(row: &[String]) -> bool {
    matches!(row, [cell] if cell.trim().is_empty())
}

/// Split CSV text into rows of unquoted cells.
fn split_rows(text: &str) -> Result<Vec<Vec<String>>, TableError> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    cell.push('"');
                }
                '"' => in_quotes = false,
                _ => cell.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut cell)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                row.push(std::mem::take(&mut cell));
                rows.push(std::mem::take(&mut row));
            }
            _ => cell.push(c),
        }
    }

    if in_quotes {
        return Err(TableError::Unterminated(rows.len()));
    }
    if !cell.is_empty() || !row.is_empty() {
        row.push(cell);
        rows.push(row);
    }

    Ok(rows)
}

/// A reading as it appears in the JSON report.
#[derive(Debug, Serialize)]
pub struct ReportReading<'a> {
    #[serde(flatten)]
    pub record: &'a Record,
    #[serde(flatten)]
    pub signal: &'a DerivedSignal,
}

/// Full JSON report of one fetch.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub channel: Option<&'a ChannelInfo>,
    pub generated_at: String,
    pub expected_interval_hours: f64,
    pub freshness: FreshnessStatus,
    pub stats: &'a FeedStats,
    pub readings: Vec<ReportReading<'a>>,
}

impl<'a> Report<'a> {
    pub fn new(data: &'a DashboardData) -> Self {
        Self {
            channel: data.channel.as_ref(),
            generated_at: Local::now().to_rfc3339(),
            expected_interval_hours: data.expected_interval_hours,
            freshness: data.freshness(),
            stats: &data.stats,
            readings: data
                .records
                .iter()
                .zip(&data.signals)
                .map(|(record, signal)| ReportReading { record, signal })
                .collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::normalize::normalize;
    use crate::source::RawFeedBatch;
    use chrono::TimeZone;

    fn sample_batch() -> RawFeedBatch {
        serde_json::from_str(
            r#"{
                "channel": { "id": 99, "name": "Bed A" },
                "feeds": [
                    { "created_at": "2024-05-01T09:00:00Z", "entry_id": 1,
                      "field1": "23.5", "field2": "1800", "field3": "3.91", "field4": "4",
                      "field8": "WiFi+connected.+Signal%3A+-67+dBm" },
                    { "created_at": "2024-05-01T12:00:00Z", "entry_id": 2,
                      "field1": "abc", "field3": "3.88", "field4": "1",
                      "field8": "Retry,+then+%22ok%22" },
                    { "created_at": "2024-05-01T15:00:00Z", "entry_id": 3,
                      "field1": "27", "field5": "1.25" }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_csv_layout() {
        let records = normalize(&sample_batch());
        let csv = to_csv_string(&records);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], CSV_HEADER.join(","));
        assert_eq!(
            lines[1],
            "2024-05-01T09:00:00Z,1,23.5,1800,3.91,4,Normal Reading,,,,-67,WiFi connected. Signal: -67 dBm"
        );
        assert_eq!(
            lines[2],
            "2024-05-01T12:00:00Z,2,,,3.88,1,Upload Retry Success,,,,,\"Retry, then \"\"ok\"\"\""
        );
        assert_eq!(lines[3], "2024-05-01T15:00:00Z,3,27,,,,Unknown,1.25,,,,");
    }

    #[test]
    fn test_csv_round_trip() {
        let records = normalize(&sample_batch());
        let parsed = parse_csv(&to_csv_string(&records)).unwrap();

        assert_eq!(parsed.len(), records.len());
        for (a, b) in records.iter().zip(&parsed) {
            assert_eq!(a.moisture, b.moisture);
            assert_eq!(a.battery_voltage, b.battery_voltage);
            assert_eq!(a.status_code, b.status_code);
        }
        assert_eq!(parsed, records);
    }

    #[test]
    fn test_parse_multiline_cell() {
        let text = format!(
            "{}\r\n2024-05-01 10:00:00,,1,,,,Unknown,,,,,\"line one\nline two\"\r\n",
            CSV_HEADER.join(",")
        );
        let records = parse_csv(&text).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].signal_text, "line one\nline two");
        assert!(matches!(records[0].timestamp, Timestamp::Naive(_)));
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let records = normalize(&sample_batch());
        let text = format!("{}\n", to_csv_string(&records));
        assert_eq!(parse_csv(&text).unwrap(), records);

        let gappy = format!(
            "{}\n\n2024-05-01T10:00:00Z,,5,,,,Unknown,,,,,\n  \n",
            CSV_HEADER.join(",")
        );
        let parsed = parse_csv(&gappy).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].moisture, Some(5.0));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_csv(""), Err(TableError::Header(_))));
        assert!(matches!(parse_csv("time,value\n"), Err(TableError::Header(_))));

        let short = format!("{}\n2024-05-01T10:00:00Z,1\n", CSV_HEADER.join(","));
        assert!(matches!(
            parse_csv(&short),
            Err(TableError::Width { row: 1, found: 2, .. })
        ));

        let open = format!("{}\n\"unterminated", CSV_HEADER.join(","));
        assert!(matches!(parse_csv(&open), Err(TableError::Unterminated(_))));
    }

    #[test]
    fn test_parse_drops_bad_timestamps() {
        let text = format!(
            "{}\nnot-a-time,,1,,,,Unknown,,,,,\n2024-05-01T10:00:00Z,,2,,,,Unknown,,,,,\n",
            CSV_HEADER.join(",")
        );
        let records = parse_csv(&text).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].moisture, Some(2.0));
    }

    #[test]
    fn test_default_export_name() {
        let now = Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).unwrap();
        assert_eq!(
            default_export_name("123456", now),
            "moisture_data_123456_20240501_123005.csv"
        );
    }

    #[test]
    fn test_report_json() {
        let data = DashboardData::from_batch(sample_batch(), 3.0);
        let json = Report::new(&data).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["channel"]["name"], "Bed A");
        assert_eq!(value["stats"]["total_readings"], 3);
        assert_eq!(value["stats"]["retry_count"], 1);
        assert_eq!(value["readings"][0]["signal_dbm"], -67);
        assert_eq!(value["readings"][1]["attempts"]["count"], 2);
        assert_eq!(value["readings"][2]["timestamp"], "2024-05-01T15:00:00Z");
        assert_eq!(value["expected_interval_hours"], 3.0);
    }
}
