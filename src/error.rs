//! Error types for fetching and re-reading feed data.

use thiserror::Error;

/// Errors that can occur when fetching a channel feed.
///
/// Every variant renders a message suitable for showing to the user as is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request could not be built (empty channel id, bad result count).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The API answered with a non-success status.
    #[error("API returned status {0}")]
    Status(u16),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Connection(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Http(err.to_string())
        }
    }
}

/// Errors reading an exported CSV table back in.
#[derive(Debug, Error)]
pub enum TableError {
    /// The header row is missing or does not match the export layout.
    #[error("Unexpected header: {0}")]
    Header(String),

    /// A row has the wrong number of cells.
    #[error("Row {row}: expected {expected} cells, found {found}")]
    Width {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// A quoted cell was never closed.
    #[error("Row {0}: unterminated quoted cell")]
    Unterminated(usize),
}
