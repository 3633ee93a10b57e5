//! Aggregate statistics over a normalized feed.

use serde::Serialize;

use super::normalize::Record;
use super::status::{derive_attempts, extract_signal_dbm, latest};

/// Battery voltage below which the device is considered low on charge.
pub const LOW_BATTERY_VOLTS: f64 = 3.3;

/// Summary numbers shown on the overview cards.
///
/// "Current" means the record with the newest timestamp. `current_*` show 0
/// when that record lacks the value; the zero is for display only.
/// `average_moisture` is 0 only when no record carries a moisture value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedStats {
    pub current_moisture: f64,
    pub current_battery: f64,
    pub average_moisture: f64,
    /// Records whose derived attempt count is 2.
    pub retry_count: usize,
    pub total_readings: usize,
    /// Latest battery reading is present and below [`LOW_BATTERY_VOLTS`].
    pub low_battery: bool,
    /// Most recent signal strength found in any log line.
    pub latest_signal_dbm: Option<i64>,
}

impl FeedStats {
    /// Compute statistics; "current" values come from the newest record.
    pub fn from_records(records: &[Record]) -> Self {
        let newest = latest(records);
        let current_moisture = newest.and_then(|r| r.moisture);
        let current_battery = newest.and_then(|r| r.battery_voltage);

        let moisture: Vec<f64> = records.iter().filter_map(|r| r.moisture).collect();
        let average_moisture = if moisture.is_empty() {
            0.0
        } else {
            moisture.iter().sum::<f64>() / moisture.len() as f64
        };

        let retry_count =
            records.iter().filter(|r| derive_attempts(r.status_code).count == 2).count();

        let latest_signal_dbm = records
            .iter()
            .filter_map(|r| {
                let dbm = extract_signal_dbm(Some(r.signal_text.as_str()))?;
                Some((r.timestamp.to_utc(), dbm))
            })
            .max_by_key(|(at, _)| *at)
            .map(|(_, dbm)| dbm);

        Self {
            current_moisture: current_moisture.unwrap_or(0.0),
            current_battery: current_battery.unwrap_or(0.0),
            average_moisture,
            retry_count,
            total_readings: records.len(),
            low_battery: current_battery.is_some_and(|v| v < LOW_BATTERY_VOLTS),
            latest_signal_dbm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::normalize::Timestamp;

    fn record(moisture: Option<f64>, battery: Option<f64>, code: Option<i64>, text: &str) -> Record {
        record_at("2024-05-01T10:00:00Z", moisture, battery, code, text)
    }

    fn record_at(
        at: &str,
        moisture: Option<f64>,
        battery: Option<f64>,
        code: Option<i64>,
        text: &str,
    ) -> Record {
        Record {
            timestamp: Timestamp::parse(at).unwrap(),
            entry_id: None,
            moisture,
            adc: None,
            battery_voltage: battery,
            status_code: code,
            aux: [None; 3],
            signal_text: text.to_string(),
        }
    }

    #[test]
    fn test_empty_stats() {
        let stats = FeedStats::from_records(&[]);
        assert_eq!(stats.total_readings, 0);
        assert_eq!(stats.current_moisture, 0.0);
        assert_eq!(stats.average_moisture, 0.0);
        assert!(!stats.low_battery);
        assert_eq!(stats.latest_signal_dbm, None);
    }

    #[test]
    fn test_stats() {
        let records = vec![
            record(Some(20.0), Some(3.9), Some(4), "Signal: -70 dBm"),
            record(None, Some(3.8), Some(1), ""),
            record(Some(30.0), Some(3.7), Some(2), "Signal: -64 dBm"),
            record(Some(40.0), Some(3.2), None, "no signal"),
        ];

        let stats = FeedStats::from_records(&records);
        assert_eq!(stats.current_moisture, 40.0);
        assert_eq!(stats.current_battery, 3.2);
        assert!((stats.average_moisture - 30.0).abs() < 1e-9);
        assert_eq!(stats.retry_count, 2);
        assert_eq!(stats.total_readings, 4);
        assert!(stats.low_battery);
        assert_eq!(stats.latest_signal_dbm, Some(-64));
    }

    #[test]
    fn test_absent_current_values_display_as_zero() {
        let records = vec![record(Some(25.0), Some(3.9), None, ""), record(None, None, None, "")];
        let stats = FeedStats::from_records(&records);
        assert_eq!(stats.current_moisture, 0.0);
        assert_eq!(stats.current_battery, 0.0);
        assert!(!stats.low_battery);
        assert_eq!(stats.average_moisture, 25.0);
    }

    #[test]
    fn test_current_values_follow_newest_timestamp() {
        let records = vec![
            record_at("2024-05-01T12:00:00Z", Some(50.0), Some(3.1), None, "Signal: -58 dBm"),
            record_at("2024-05-01T09:00:00Z", Some(20.0), Some(3.9), None, "Signal: -80 dBm"),
        ];

        let stats = FeedStats::from_records(&records);
        assert_eq!(latest(&records).and_then(|r| r.moisture), Some(50.0));
        assert_eq!(stats.current_moisture, 50.0);
        assert_eq!(stats.current_battery, 3.1);
        assert!(stats.low_battery);
        assert_eq!(stats.latest_signal_dbm, Some(-58));
    }
}
