//! File-based data source.
//!
//! Polls a saved feed response (the JSON body of `feeds.json`).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::fetch::parse_body;
use super::{FeedSource, RawFeedBatch};

/// A data source that reads a feed response from a JSON file.
///
/// Useful for offline inspection of a previously downloaded feed. The
/// source tracks the file's modification time and only returns new data
/// when the file has been updated or a refresh was requested.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
    last_error: Option<String>,
    last_modified: Option<SystemTime>,
    force_reload: bool,
}

impl FileSource {
    /// Create a new file source for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self {
            path,
            description,
            last_error: None,
            last_modified: None,
            force_reload: false,
        }
    }

    /// Returns the path being monitored.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the file's modification time.
    fn get_modified_time(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).ok()?.modified().ok()
    }

    /// Read and parse the file.
    fn read_file(&mut self) -> Option<RawFeedBatch> {
        match fs::read(&self.path) {
            Ok(content) => match parse_body(&content) {
                Ok(batch) => {
                    self.last_error = None;
                    Some(batch)
                }
                Err(e) => {
                    self.last_error = Some(e.to_string());
                    None
                }
            },
            Err(e) => {
                self.last_error = Some(format!("Read error: {}", e));
                None
            }
        }
    }
}

impl FeedSource for FileSource {
    fn poll(&mut self) -> Option<RawFeedBatch> {
        let current_modified = self.get_modified_time();

        // Check if file has been modified since last read
        let file_changed = match (&self.last_modified, &current_modified) {
            (None, _) => true,        // First poll, always read
            (Some(_), None) => false, // File disappeared, don't update
            (Some(last), Some(current)) => current > last,
        };

        if file_changed || std::mem::take(&mut self.force_reload) {
            if let Some(batch) = self.read_file() {
                self.last_modified = current_modified;
                return Some(batch);
            }
        }

        None
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn request_refresh(&mut self) {
        self.force_reload = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_json() -> &'static str {
        r#"{
            "channel": { "id": 1, "name": "Test Channel" },
            "feeds": [
                { "created_at": "2024-05-01T10:00:00Z", "field1": "23.5" },
                { "created_at": "2024-05-01T13:00:00Z", "field1": "24.0" }
            ]
        }"#
    }

    #[test]
    fn test_file_source_new() {
        let source = FileSource::new("/tmp/feeds.json");
        assert_eq!(source.path(), Path::new("/tmp/feeds.json"));
        assert_eq!(source.description(), "file: /tmp/feeds.json");
        assert!(source.error().is_none());
    }

    #[test]
    fn test_file_source_poll_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();

        let mut source = FileSource::new(file.path());

        // First poll should return data
        let batch = source.poll().unwrap();
        assert_eq!(batch.channel_name(), Some("Test Channel"));
        assert_eq!(batch.entries().len(), 2);

        // Second poll without file change should return None
        assert!(source.poll().is_none());
    }

    #[test]
    fn test_file_source_refresh_rereads() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();

        let mut source = FileSource::new(file.path());
        assert!(source.poll().is_some());
        assert!(source.poll().is_none());

        source.request_refresh();
        assert!(source.poll().is_some());
        assert!(source.poll().is_none());
    }

    #[test]
    fn test_file_source_missing_file() {
        let mut source = FileSource::new("/nonexistent/path/feeds.json");

        assert!(source.poll().is_none());
        assert!(source.error().unwrap().contains("Read error"));
    }

    #[test]
    fn test_file_source_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let mut source = FileSource::new(file.path());

        assert!(source.poll().is_none());
        assert!(source.error().unwrap().contains("Failed to parse response"));
    }
}
