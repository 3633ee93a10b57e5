//! Data models and processing for channel feeds.
//!
//! This module turns a raw feed batch into typed records and the status
//! signals derived from them. Nothing in here touches the network or the
//! terminal.
//!
//! ## Submodules
//!
//! - [`duration`]: Parsing and formatting of duration strings (e.g., "30s", "2h")
//! - [`normalize`]: Raw entries to [`Record`]s with parse-or-absent coercion
//! - [`status`]: Freshness classification and per-record derived signals
//! - [`stats`]: Aggregate statistics for the overview cards
//! - [`dashboard`]: The [`DashboardData`] bundle held between refreshes
//! - [`export`]: CSV table and JSON report output
//!
//! ## Data Flow
//!
//! ```text
//! RawFeedBatch (raw JSON)
//!        │
//!        ▼
//! normalize() ──▶ Vec<Record>
//!        │
//!        ├──▶ DerivedSignal::from_record() (attempts, WiFi dBm)
//!        ├──▶ FeedStats::from_records()
//!        └──▶ classify_freshness() (re-evaluated on every render)
//! ```

pub mod dashboard;
pub mod duration;
pub mod export;
pub mod normalize;
pub mod stats;
pub mod status;

pub use dashboard::DashboardData;
pub use export::{default_export_name, parse_csv, to_csv_string, write_csv, Report};
pub use normalize::{normalize, parse_or_absent, Record, Timestamp};
pub use stats::{FeedStats, LOW_BATTERY_VOLTS};
pub use status::{
    classify_freshness, classify_freshness_at, derive_attempts, extract_signal_dbm, AttemptClass,
    AttemptInfo, DerivedSignal, Freshness, FreshnessStatus, DEFAULT_INTERVAL_HOURS,
};
