//! The processed result of one successful fetch.

use std::time::Instant;

use chrono::{DateTime, Local, Utc};

use super::normalize::{normalize, Record};
use super::stats::FeedStats;
use super::status::{classify_freshness_at, DerivedSignal, FreshnessStatus};
use crate::source::{ChannelInfo, RawFeedBatch};

/// Everything the dashboard shows for one fetch.
///
/// Built from scratch for every batch and replaced wholesale; a failed
/// fetch never touches it.
#[derive(Debug, Clone)]
pub struct DashboardData {
    pub channel: Option<ChannelInfo>,
    pub records: Vec<Record>,
    /// Derived signals, index-aligned with `records`.
    pub signals: Vec<DerivedSignal>,
    pub stats: FeedStats,
    pub expected_interval_hours: f64,
    /// Wall-clock time the batch was processed.
    pub loaded_at: DateTime<Local>,
    pub last_updated: Instant,
}

impl DashboardData {
    /// Run the normalizer and status evaluator over a raw batch.
    pub fn from_batch(batch: RawFeedBatch, expected_interval_hours: f64) -> Self {
        let records = normalize(&batch);
        let signals = records.iter().map(DerivedSignal::from_record).collect();
        let stats = FeedStats::from_records(&records);

        Self {
            channel: batch.channel,
            records,
            signals,
            stats,
            expected_interval_hours,
            loaded_at: Local::now(),
            last_updated: Instant::now(),
        }
    }

    /// Freshness of the latest record, evaluated now.
    ///
    /// Re-evaluated on every call so a dashboard left open ages correctly.
    pub fn freshness(&self) -> FreshnessStatus {
        self.freshness_at(Utc::now())
    }

    pub fn freshness_at(&self, now: DateTime<Utc>) -> FreshnessStatus {
        classify_freshness_at(&self.records, self.expected_interval_hours, now)
    }

    /// Channel name for headers, falling back to the channel id.
    pub fn channel_title(&self) -> String {
        match &self.channel {
            Some(ChannelInfo { name: Some(name), .. }) if !name.is_empty() => name.clone(),
            Some(ChannelInfo { id: Some(id), .. }) => format!("Channel {}", id),
            _ => "Unnamed channel".to_string(),
        }
    }

    /// Label the channel assigns to `fieldN`, if any.
    pub fn field_label(&self, n: usize) -> Option<&str> {
        let channel = self.channel.as_ref()?;
        let label = match n {
            1 => &channel.field1,
            2 => &channel.field2,
            3 => &channel.field3,
            4 => &channel.field4,
            5 => &channel.field5,
            6 => &channel.field6,
            7 => &channel.field7,
            8 => &channel.field8,
            _ => return None,
        };
        label.as_deref().filter(|l| !l.is_empty())
    }

    /// Records with their signals, newest first.
    pub fn newest_first(&self) -> impl Iterator<Item = (&Record, &DerivedSignal)> {
        self.records.iter().zip(&self.signals).rev()
    }

    /// Record and signal at a newest-first row index.
    pub fn row(&self, index: usize) -> Option<(&Record, &DerivedSignal)> {
        let raw = self.records.len().checked_sub(index + 1)?;
        Some((self.records.get(raw)?, self.signals.get(raw)?))
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::status::Freshness;
    use chrono::TimeZone;

    fn batch() -> RawFeedBatch {
        serde_json::from_str(
            r#"{
                "channel": { "id": 7, "name": "", "field1": "Moisture", "field2": "" },
                "feeds": [
                    { "created_at": "2024-05-01T09:00:00Z", "field1": "20", "field4": "2" },
                    { "created_at": "garbage", "field1": "21" },
                    { "created_at": "2024-05-01T11:00:00Z", "field1": "22", "field4": "4" }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_from_batch() {
        let data = DashboardData::from_batch(batch(), 3.0);
        assert_eq!(data.records.len(), 2);
        assert_eq!(data.signals.len(), 2);
        assert_eq!(data.stats.retry_count, 1);
        assert_eq!(data.channel_title(), "Channel 7");
        assert_eq!(data.field_label(1), Some("Moisture"));
        assert_eq!(data.field_label(2), None);
        assert_eq!(data.field_label(9), None);
    }

    #[test]
    fn test_newest_first_rows() {
        let data = DashboardData::from_batch(batch(), 3.0);
        let moisture: Vec<_> = data.newest_first().map(|(r, _)| r.moisture).collect();
        assert_eq!(moisture, vec![Some(22.0), Some(20.0)]);

        assert_eq!(data.row(0).unwrap().0.moisture, Some(22.0));
        assert_eq!(data.row(1).unwrap().1.attempts.count, 2);
        assert!(data.row(2).is_none());
    }

    #[test]
    fn test_freshness_at() {
        let data = DashboardData::from_batch(batch(), 3.0);
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(data.freshness_at(now).state, Freshness::Normal);

        let later = Utc.with_ymd_and_hms(2024, 5, 1, 17, 0, 0).unwrap();
        assert_eq!(data.freshness_at(later).state, Freshness::Missed);

        let empty = DashboardData::from_batch(RawFeedBatch::default(), 3.0);
        assert!(empty.is_empty());
        assert_eq!(empty.freshness().message, "no data available");
    }
}
