//! Polling data source backed by the feed API.
//!
//! A single background task fetches the feed, publishes each outcome on a
//! tokio watch channel and then waits for the next tick or a manual refresh.
//! Fetches never overlap and the newest outcome always replaces the previous
//! one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::fetch::{FeedFetcher, FeedRequest};
use super::{FeedSource, RawFeedBatch};
use crate::error::FetchError;

/// When the poller fetches again after the initial fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshSchedule {
    /// Only when a refresh is requested.
    Manual,
    /// On a fixed interval, and additionally on request.
    Every(Duration),
}

type Outcome = Option<Result<RawFeedBatch, FetchError>>;

/// A data source that polls the feed API from a background task.
///
/// Must be created inside a tokio runtime. Dropping the source stops the
/// poller.
#[derive(Debug)]
pub struct HttpSource {
    receiver: watch::Receiver<Outcome>,
    refresh: Arc<Notify>,
    description: String,
    last_error: Option<String>,
    task: JoinHandle<()>,
}

impl HttpSource {
    /// Spawn the poller; the first fetch starts immediately.
    pub fn spawn<F: FeedFetcher>(
        fetcher: F,
        request: FeedRequest,
        schedule: RefreshSchedule,
    ) -> Self {
        let description = fetcher.describe(&request);
        let (tx, receiver) = watch::channel(None);
        let refresh = Arc::new(Notify::new());
        let task = tokio::spawn(run_poller(fetcher, request, schedule, tx, refresh.clone()));

        Self {
            receiver,
            refresh,
            description,
            last_error: None,
            task,
        }
    }
}

async fn run_poller<F: FeedFetcher>(
    fetcher: F,
    request: FeedRequest,
    schedule: RefreshSchedule,
    tx: watch::Sender<Outcome>,
    refresh: Arc<Notify>,
) {
    loop {
        let outcome = fetcher.fetch(&request).await;
        if let Err(ref e) = outcome {
            warn!(channel = request.channel_id(), error = %e, "feed fetch failed");
        }

        if tx.send(Some(outcome)).is_err() {
            debug!("source dropped, stopping poller");
            return;
        }

        match schedule {
            RefreshSchedule::Manual => refresh.notified().await,
            RefreshSchedule::Every(interval) => {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = refresh.notified() => {}
                }
            }
        }
    }
}

impl FeedSource for HttpSource {
    fn poll(&mut self) -> Option<RawFeedBatch> {
        if !self.receiver.has_changed().unwrap_or(false) {
            return None;
        }

        match self.receiver.borrow_and_update().clone() {
            Some(Ok(batch)) => {
                self.last_error = None;
                Some(batch)
            }
            Some(Err(e)) => {
                self.last_error = Some(e.to_string());
                None
            }
            None => None,
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn request_refresh(&mut self) {
        self.refresh.notify_one();
    }
}

impl Drop for HttpSource {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RawFeedEntry;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed list of outcomes, repeating the last one.
    struct ScriptedFetcher {
        outcomes: Mutex<VecDeque<Result<RawFeedBatch, FetchError>>>,
    }

    impl ScriptedFetcher {
        fn new(outcomes: Vec<Result<RawFeedBatch, FetchError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
            }
        }
    }

    #[async_trait]
    impl FeedFetcher for ScriptedFetcher {
        async fn fetch(&self, _request: &FeedRequest) -> Result<RawFeedBatch, FetchError> {
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.len() > 1 {
                outcomes.pop_front().unwrap()
            } else {
                outcomes.front().cloned().unwrap()
            }
        }

        fn describe(&self, request: &FeedRequest) -> String {
            format!("scripted: {}", request.channel_id())
        }
    }

    fn batch_of(n: usize) -> RawFeedBatch {
        RawFeedBatch {
            channel: None,
            feeds: Some(vec![RawFeedEntry::default(); n]),
        }
    }

    async fn wait_for_change(source: &mut HttpSource) -> Option<RawFeedBatch> {
        for _ in 0..200 {
            if source.receiver.has_changed().unwrap_or(false) {
                return source.poll();
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("poller produced no outcome");
    }

    #[tokio::test]
    async fn test_manual_refresh_publishes_outcomes() {
        let fetcher = ScriptedFetcher::new(vec![Ok(batch_of(2)), Err(FetchError::Timeout)]);
        let request = FeedRequest::new("42", None, 20).unwrap();
        let mut source = HttpSource::spawn(fetcher, request, RefreshSchedule::Manual);

        assert_eq!(source.description(), "scripted: 42");

        let first = wait_for_change(&mut source).await;
        assert_eq!(first.unwrap().entries().len(), 2);
        assert!(source.error().is_none());

        // No refresh requested: nothing new.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(source.poll().is_none());

        source.request_refresh();
        let second = wait_for_change(&mut source).await;
        assert!(second.is_none());
        assert_eq!(source.error(), Some("Request timed out"));
    }

    #[tokio::test]
    async fn test_success_clears_previous_error() {
        let fetcher = ScriptedFetcher::new(vec![Err(FetchError::Status(500)), Ok(batch_of(1))]);
        let request = FeedRequest::new("42", None, 20).unwrap();
        let mut source = HttpSource::spawn(fetcher, request, RefreshSchedule::Manual);

        assert!(wait_for_change(&mut source).await.is_none());
        assert_eq!(source.error(), Some("API returned status 500"));

        source.request_refresh();
        assert!(wait_for_change(&mut source).await.is_some());
        assert!(source.error().is_none());
    }

    #[tokio::test]
    async fn test_interval_schedule_refetches() {
        let fetcher = ScriptedFetcher::new(vec![Ok(batch_of(1)), Ok(batch_of(3))]);
        let request = FeedRequest::new("42", None, 20).unwrap();
        let mut source = HttpSource::spawn(
            fetcher,
            request,
            RefreshSchedule::Every(Duration::from_millis(10)),
        );

        assert_eq!(wait_for_change(&mut source).await.unwrap().entries().len(), 1);
        assert_eq!(wait_for_change(&mut source).await.unwrap().entries().len(), 3);
    }
}
