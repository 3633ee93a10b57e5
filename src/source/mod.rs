//! Data source abstraction for receiving feed batches.
//!
//! This module provides a trait-based abstraction over where feed data
//! comes from: the live API (polled in the background) or a saved response
//! on disk.

mod feed;
mod fetch;
mod file;
mod http;

pub use feed::{ChannelInfo, RawFeedBatch, RawFeedEntry};
pub use fetch::{
    parse_body, FeedClient, FeedClientBuilder, FeedFetcher, FeedRequest, ALLOWED_RESULTS,
    DEFAULT_HOST, DEFAULT_RESULTS, DEFAULT_TIMEOUT,
};
pub use file::FileSource;
pub use http::{HttpSource, RefreshSchedule};

use std::fmt::Debug;

/// Trait for receiving feed batches from various sources.
///
/// # Example
///
/// ```
/// use feedwatch::source::{FeedSource, FileSource};
///
/// let mut source = FileSource::new("feeds.json");
/// if let Some(batch) = source.poll() {
///     println!("Got {} entries", batch.entries().len());
/// }
/// ```
pub trait FeedSource: Send + Debug {
    /// Poll for the latest batch.
    ///
    /// Returns `Some(batch)` if a new batch is available, `None` otherwise.
    /// This method should be non-blocking.
    fn poll(&mut self) -> Option<RawFeedBatch>;

    /// Returns a human-readable description of the source.
    ///
    /// Used for display in the TUI status bar.
    fn description(&self) -> &str;

    /// Returns the error from the most recent failed load, if the latest
    /// attempt failed.
    fn error(&self) -> Option<&str>;

    /// Ask the source to load again as soon as possible.
    fn request_refresh(&mut self) {}
}
