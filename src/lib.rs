//! # feedwatch
//!
//! A terminal dashboard and library for monitoring periodic sensor feeds
//! published through a ThingSpeak-style telemetry REST API.
//!
//! The crate fetches a channel's recent feed entries, normalizes the loosely
//! typed fields into [`Record`]s, derives status signals (update freshness,
//! connection attempts, WiFi signal strength, battery state) and renders them
//! as metric cards, charts and a readings table. The same pipeline can run
//! without a terminal to export CSV or a JSON report.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Application                          │
//! │  ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌─────────┐ │
//! │  │  app    │───▶│   data   │───▶│   ui    │───▶│ Terminal│ │
//! │  │ (state) │    │(normalize│    │(render) │    │         │ │
//! │  └────┬────┘    │ + status)│    └─────────┘    └─────────┘ │
//! │       │         └──────────┘                                │
//! │       ▼                                                     │
//! │  ┌─────────┐                                                │
//! │  │ source  │◀── HttpSource (background poller) | FileSource │
//! │  │ (input) │                                                │
//! │  └─────────┘                                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: The [`FeedSource`] trait, the API client ([`FeedClient`])
//!   and the two sources: a background HTTP poller and a saved-response file
//! - **[`data`]**: Normalization, freshness classification, derived signals,
//!   aggregate stats and CSV/JSON export
//! - **[`app`]**: Application state, view navigation and user actions
//! - **[`ui`]**: Terminal rendering using ratatui
//! - **[`config`]**: Optional TOML settings with channel presets
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Watch a public channel, refreshing every 30 seconds
//! feedwatch --channel 123456 --auto-refresh
//!
//! # Private channel from a preset in feedwatch.toml
//! feedwatch --preset garden
//!
//! # Fetch once and write a CSV
//! feedwatch --channel 123456 --results 100 --export readings.csv
//! ```
//!
//! ### As a library
//!
//! ```
//! use feedwatch::{classify_freshness, normalize, Freshness, RawFeedBatch};
//!
//! let batch: RawFeedBatch = serde_json::from_str(
//!     r#"{ "feeds": [ { "created_at": "2024-05-01T10:00:00Z", "field1": "41.5" } ] }"#,
//! ).unwrap();
//!
//! let records = normalize(&batch);
//! assert_eq!(records[0].moisture, Some(41.5));
//!
//! // A reading from 2024 is long overdue for a 3-hour interval
//! let status = classify_freshness(&records, 3.0);
//! assert_eq!(status.state, Freshness::Missed);
//! ```
//!
//! ### Polling the API from a background task
//!
//! ```no_run
//! use feedwatch::{App, FeedClient, FeedRequest, HttpSource, RefreshSchedule};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let client = FeedClient::builder().build().unwrap();
//! let request = FeedRequest::new("123456", None, 20).unwrap();
//! let source = HttpSource::spawn(
//!     client,
//!     request,
//!     RefreshSchedule::Every(Duration::from_secs(30)),
//! );
//! let app = App::new(Box::new(source), 3.0, "123456");
//! # });
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod source;
pub mod ui;

// Re-export main types for convenience
pub use app::App;
pub use data::{
    classify_freshness, derive_attempts, extract_signal_dbm, normalize, DashboardData,
    DerivedSignal, FeedStats, Freshness, FreshnessStatus, Record, Timestamp,
};
pub use error::{FetchError, TableError};
pub use source::{
    FeedClient, FeedFetcher, FeedRequest, FeedSource, FileSource, HttpSource, RawFeedBatch,
    RefreshSchedule,
};
