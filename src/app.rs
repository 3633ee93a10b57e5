//! Application state and navigation logic.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use chrono::Local;
use tracing::{info, warn};

use crate::data::{default_export_name, write_csv, DashboardData, DerivedSignal, Record};
use crate::source::FeedSource;
use crate::ui::Theme;

/// The current view/tab in the TUI.
///
/// Reading detail is shown as an overlay (controlled by
/// `App::show_detail_overlay`) rather than as a separate view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Metric cards, channel info and the latest log line.
    Overview,
    /// Time series charts.
    Charts,
    /// Table of individual readings.
    Readings,
}

impl View {
    pub const ALL: [View; 3] = [View::Overview, View::Charts, View::Readings];

    /// Cycle to the next view.
    pub fn next(self) -> Self {
        match self {
            View::Overview => View::Charts,
            View::Charts => View::Readings,
            View::Readings => View::Overview,
        }
    }

    /// Cycle to the previous view.
    pub fn prev(self) -> Self {
        match self {
            View::Overview => View::Readings,
            View::Charts => View::Overview,
            View::Readings => View::Charts,
        }
    }

    /// Returns the display label for this view.
    pub fn label(&self) -> &'static str {
        match self {
            View::Overview => "Overview",
            View::Charts => "Charts",
            View::Readings => "Readings",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            View::Overview => 0,
            View::Charts => 1,
            View::Readings => 2,
        }
    }
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub current_view: View,
    pub show_help: bool,
    pub show_detail_overlay: bool,

    // Data source
    source: Box<dyn FeedSource>,
    pub data: Option<DashboardData>,
    pub load_error: Option<String>,
    pub expected_interval_hours: f64,
    /// Auto-refresh interval, shown in the status bar.
    pub auto_refresh: Option<Duration>,

    // Navigation state (newest-first row index in the Readings table)
    pub selected_row: usize,

    // Export
    export_label: String,
    export_dir: PathBuf,

    // UI
    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create a new App for the given source.
    ///
    /// `export_label` names exported files (usually the channel id).
    pub fn new(
        source: Box<dyn FeedSource>,
        expected_interval_hours: f64,
        export_label: impl Into<String>,
    ) -> Self {
        Self {
            running: true,
            current_view: View::Overview,
            show_help: false,
            show_detail_overlay: false,
            source,
            data: None,
            load_error: None,
            expected_interval_hours,
            auto_refresh: None,
            selected_row: 0,
            export_label: export_label.into(),
            export_dir: PathBuf::from("."),
            theme: Theme::dark(),
            status_message: None,
        }
    }

    pub fn with_auto_refresh(mut self, interval: Option<Duration>) -> Self {
        self.auto_refresh = interval;
        self
    }

    /// Directory the `e` key writes CSV files into.
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Returns a description of the current data source.
    pub fn source_description(&self) -> &str {
        self.source.description()
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired (3 seconds).
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < Duration::from_secs(3) {
                return Some(msg);
            }
        }
        None
    }

    /// Poll the data source for a new batch.
    ///
    /// Returns true if new data was received. A failed load only updates
    /// `load_error`; the previous data stays on screen.
    pub fn reload_data(&mut self) -> bool {
        let received = match self.source.poll() {
            Some(batch) => {
                let data = DashboardData::from_batch(batch, self.expected_interval_hours);
                info!(records = data.records.len(), "dashboard updated");
                self.set_status_message(format!("Loaded {} entries", data.records.len()));

                let max = data.records.len().saturating_sub(1);
                self.selected_row = self.selected_row.min(max);
                if data.is_empty() {
                    self.show_detail_overlay = false;
                }
                self.data = Some(data);
                true
            }
            None => false,
        };

        self.load_error = self.source.error().map(str::to_string);
        received
    }

    /// Ask the source for a fresh load.
    pub fn refresh(&mut self) {
        self.source.request_refresh();
        self.set_status_message("Refreshing...".to_string());
    }

    /// Switch to the next view (cycles through Overview → Charts → Readings).
    pub fn next_view(&mut self) {
        self.current_view = self.current_view.next();
    }

    /// Switch to the previous view.
    pub fn prev_view(&mut self) {
        self.current_view = self.current_view.prev();
    }

    /// Switch to a specific view.
    pub fn set_view(&mut self, view: View) {
        self.current_view = view;
    }

    fn row_count(&self) -> usize {
        self.data.as_ref().map_or(0, |d| d.records.len())
    }

    /// Move selection down by one row.
    pub fn select_next(&mut self) {
        self.select_next_n(1);
    }

    /// Move selection up by one row.
    pub fn select_prev(&mut self) {
        self.select_prev_n(1);
    }

    /// Move selection down by n rows.
    pub fn select_next_n(&mut self, n: usize) {
        let max = self.row_count().saturating_sub(1);
        self.selected_row = (self.selected_row + n).min(max);
    }

    /// Move selection up by n rows.
    pub fn select_prev_n(&mut self, n: usize) {
        self.selected_row = self.selected_row.saturating_sub(n);
    }

    /// Jump to the newest reading.
    pub fn select_first(&mut self) {
        self.selected_row = 0;
    }

    /// Jump to the oldest reading.
    pub fn select_last(&mut self) {
        self.selected_row = self.row_count().saturating_sub(1);
    }

    /// The currently selected reading.
    pub fn selected_reading(&self) -> Option<(&Record, &DerivedSignal)> {
        self.data.as_ref()?.row(self.selected_row)
    }

    /// Open the detail overlay for the selected reading.
    pub fn enter_detail(&mut self) {
        if self.current_view == View::Readings && self.selected_reading().is_some() {
            self.show_detail_overlay = true;
        }
    }

    /// Navigate back: close the overlay first, then return to Overview.
    pub fn go_back(&mut self) {
        if self.show_detail_overlay {
            self.show_detail_overlay = false;
        } else {
            self.current_view = View::Overview;
        }
    }

    /// Close the detail overlay if open.
    pub fn close_overlay(&mut self) {
        self.show_detail_overlay = false;
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Write the current records to a CSV file. Returns the row count.
    pub fn export_csv(&self, path: &Path) -> Result<usize> {
        let Some(ref data) = self.data else {
            bail!("No data to export");
        };
        if data.is_empty() {
            bail!("No data to export");
        }

        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        write_csv(&data.records, BufWriter::new(file))?;
        Ok(data.records.len())
    }

    /// Export to a timestamped file in the export directory and report the
    /// result in the status bar.
    pub fn export_default(&mut self) {
        let name = default_export_name(&self.export_label, Local::now());
        let path = self.export_dir.join(name);
        match self.export_csv(&path) {
            Ok(rows) => {
                info!(path = %path.display(), rows, "exported csv");
                self.set_status_message(format!("Exported {} rows to {}", rows, path.display()));
            }
            Err(e) => {
                warn!(error = %e, "csv export failed");
                self.set_status_message(format!("Export failed: {}", e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RawFeedBatch;
    use tempfile::TempDir;

    /// Source that hands out queued batches and a fixed error.
    #[derive(Debug, Default)]
    struct StubSource {
        batches: Vec<RawFeedBatch>,
        error: Option<String>,
    }

    impl FeedSource for StubSource {
        fn poll(&mut self) -> Option<RawFeedBatch> {
            if self.batches.is_empty() {
                None
            } else {
                Some(self.batches.remove(0))
            }
        }

        fn description(&self) -> &str {
            "stub"
        }

        fn error(&self) -> Option<&str> {
            self.error.as_deref()
        }
    }

    fn batch(n: usize) -> RawFeedBatch {
        let feeds: Vec<String> = (0..n)
            .map(|i| {
                format!(
                    r#"{{ "created_at": "2024-05-01T{:02}:00:00Z", "entry_id": {}, "field1": "{}", "field4": "4" }}"#,
                    i % 24,
                    i + 1,
                    20 + i
                )
            })
            .collect();
        serde_json::from_str(&format!(
            r#"{{ "channel": {{ "id": 99, "name": "Garden" }}, "feeds": [{}] }}"#,
            feeds.join(",")
        ))
        .unwrap()
    }

    fn app_with(source: StubSource) -> App {
        App::new(Box::new(source), 3.0, "99")
    }

    #[test]
    fn test_view_cycle() {
        assert_eq!(View::Overview.next(), View::Charts);
        assert_eq!(View::Readings.next(), View::Overview);
        assert_eq!(View::Overview.prev(), View::Readings);
        for (i, view) in View::ALL.iter().enumerate() {
            assert_eq!(view.index(), i);
        }
    }

    #[test]
    fn test_reload_replaces_data() {
        let mut app = app_with(StubSource {
            batches: vec![batch(3)],
            ..Default::default()
        });
        assert!(app.reload_data());
        assert_eq!(app.data.as_ref().unwrap().records.len(), 3);
        assert_eq!(app.get_status_message(), Some("Loaded 3 entries"));
        assert!(!app.reload_data());
    }

    #[test]
    fn test_error_keeps_previous_data() {
        let mut app = app_with(StubSource {
            batches: vec![batch(2)],
            ..Default::default()
        });
        app.reload_data();

        app.source = Box::new(StubSource {
            error: Some("API returned status 500".to_string()),
            ..Default::default()
        });
        assert!(!app.reload_data());
        assert_eq!(app.load_error.as_deref(), Some("API returned status 500"));
        assert_eq!(app.data.as_ref().unwrap().records.len(), 2);
    }

    #[test]
    fn test_selection_is_clamped() {
        let mut app = app_with(StubSource {
            batches: vec![batch(5), batch(2)],
            ..Default::default()
        });
        app.reload_data();

        app.select_next_n(10);
        assert_eq!(app.selected_row, 4);
        app.select_prev();
        assert_eq!(app.selected_row, 3);
        app.select_first();
        assert_eq!(app.selected_row, 0);
        app.select_last();
        assert_eq!(app.selected_row, 4);

        // Smaller batch pulls the selection back in range
        app.reload_data();
        assert_eq!(app.selected_row, 1);
    }

    #[test]
    fn test_selected_reading_is_newest_first() {
        let mut app = app_with(StubSource {
            batches: vec![batch(3)],
            ..Default::default()
        });
        app.reload_data();
        let (record, _) = app.selected_reading().unwrap();
        assert_eq!(record.entry_id, Some(3));
    }

    #[test]
    fn test_detail_overlay_only_in_readings() {
        let mut app = app_with(StubSource {
            batches: vec![batch(1)],
            ..Default::default()
        });
        app.reload_data();

        app.enter_detail();
        assert!(!app.show_detail_overlay);

        app.set_view(View::Readings);
        app.enter_detail();
        assert!(app.show_detail_overlay);

        app.go_back();
        assert!(!app.show_detail_overlay);
        assert_eq!(app.current_view, View::Readings);
        app.go_back();
        assert_eq!(app.current_view, View::Overview);
    }

    #[test]
    fn test_refresh_reaches_source() {
        let mut app = app_with(StubSource::default());
        app.refresh();
        assert_eq!(app.get_status_message(), Some("Refreshing..."));
    }

    #[test]
    fn test_export_without_data_fails() {
        let app = app_with(StubSource::default());
        let dir = TempDir::new().unwrap();
        assert!(app.export_csv(&dir.path().join("out.csv")).is_err());
    }

    #[test]
    fn test_export_default_writes_file() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with(StubSource {
            batches: vec![batch(2)],
            ..Default::default()
        })
        .with_export_dir(dir.path());
        app.reload_data();
        app.export_default();

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let name = files[0].as_ref().unwrap().file_name();
        assert!(name.to_string_lossy().starts_with("moisture_data_99_"));
        assert!(app.get_status_message().unwrap().starts_with("Exported 2 rows"));
    }
}
