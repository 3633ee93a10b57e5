//! HTTP client for the channel feed API.
//!
//! One GET per fetch, bounded by a timeout. Failures come back as a
//! [`FetchError`]; nothing is retried or cached here.
//!
//! ## Example
//!
//! ```no_run
//! use feedwatch::source::{FeedClient, FeedFetcher, FeedRequest};
//!
//! # tokio_test::block_on(async {
//! let client = FeedClient::builder().build().unwrap();
//! let request = FeedRequest::new("123456", None, 20).unwrap();
//! let batch = client.fetch(&request).await.unwrap();
//! println!("{} entries", batch.entries().len());
//! # });
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use super::RawFeedBatch;
use crate::error::FetchError;

/// Public ThingSpeak API host.
pub const DEFAULT_HOST: &str = "https://api.thingspeak.com";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Result counts the client accepts.
pub const ALLOWED_RESULTS: [u32; 5] = [10, 20, 50, 100, 200];

/// Default number of entries to request.
pub const DEFAULT_RESULTS: u32 = 20;

/// A validated feed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    channel_id: String,
    api_key: Option<String>,
    results: u32,
}

impl FeedRequest {
    /// Build a request; an empty API key is treated as no key.
    pub fn new(
        channel_id: impl Into<String>,
        api_key: Option<String>,
        results: u32,
    ) -> Result<Self, FetchError> {
        let channel_id = channel_id.into().trim().to_string();
        if channel_id.is_empty() {
            return Err(FetchError::InvalidRequest("channel id is empty".to_string()));
        }
        if !ALLOWED_RESULTS.contains(&results) {
            return Err(FetchError::InvalidRequest(format!(
                "result count {} is not one of {:?}",
                results, ALLOWED_RESULTS
            )));
        }

        Ok(Self {
            channel_id,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            results,
        })
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn results(&self) -> u32 {
        self.results
    }
}

/// Something that can fetch a feed batch.
///
/// The poller in [`super::HttpSource`] is written against this trait so it
/// can be driven without a network.
#[async_trait]
pub trait FeedFetcher: Send + Sync + 'static {
    async fn fetch(&self, request: &FeedRequest) -> Result<RawFeedBatch, FetchError>;

    /// Human-readable endpoint description for the status bar.
    fn describe(&self, request: &FeedRequest) -> String;
}

/// Feed API client.
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: Client,
    host: String,
}

impl FeedClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> FeedClientBuilder {
        FeedClientBuilder::default()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Full URL for a request, with the API key only when one is set.
    pub fn feed_url(&self, request: &FeedRequest) -> String {
        let mut url = format!(
            "{}/channels/{}/feeds.json?results={}",
            self.host,
            urlencoding::encode(&request.channel_id),
            request.results
        );
        if let Some(key) = &request.api_key {
            url.push_str("&api_key=");
            url.push_str(&urlencoding::encode(key));
        }
        url
    }
}

#[async_trait]
impl FeedFetcher for FeedClient {
    async fn fetch(&self, request: &FeedRequest) -> Result<RawFeedBatch, FetchError> {
        debug!(
            channel = %request.channel_id,
            results = request.results,
            authenticated = request.has_api_key(),
            "fetching feed"
        );

        let response = self.client.get(self.feed_url(request)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let batch = parse_body(&body)?;
        info!(
            channel = %request.channel_id,
            entries = batch.entries().len(),
            "fetched feed"
        );
        Ok(batch)
    }

    fn describe(&self, request: &FeedRequest) -> String {
        format!("{}/channels/{}", self.host, request.channel_id)
    }
}

/// Parse a response body into a batch.
///
/// The API answers `-1` for unknown or private channels; that and any other
/// non-object body is a parse error.
pub fn parse_body(body: &[u8]) -> Result<RawFeedBatch, FetchError> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    if !value.is_object() {
        return Err(FetchError::Parse(format!("expected a JSON object, got {}", value)));
    }
    serde_json::from_value(value).map_err(|e| FetchError::Parse(e.to_string()))
}

/// Builder for FeedClient.
#[derive(Debug, Default)]
pub struct FeedClientBuilder {
    host: Option<String>,
    timeout: Option<Duration>,
}

impl FeedClientBuilder {
    /// Set the API host (default: the public ThingSpeak API).
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<FeedClient, FetchError> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let host = self.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

        Ok(FeedClient {
            client,
            host: host.trim_end_matches('/').to_string(),
        })
    }
}
