//! Wire types for the channel feed API.
//!
//! These mirror the JSON body returned by `GET /channels/{id}/feeds.json`.
//! Field values are kept loosely typed; coercion happens in
//! [`crate::data::normalize`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A complete feed response: channel metadata plus the polled entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFeedBatch {
    /// Channel metadata, when the API includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelInfo>,

    /// Feed entries, oldest first. Missing and `null` both mean "no entries".
    #[serde(default)]
    pub feeds: Option<Vec<RawFeedEntry>>,
}

impl RawFeedBatch {
    /// Returns the entries, or an empty slice when the feed list is absent.
    pub fn entries(&self) -> &[RawFeedEntry] {
        self.feeds.as_deref().unwrap_or(&[])
    }

    /// Returns the channel name, if any.
    pub fn channel_name(&self) -> Option<&str> {
        self.channel.as_ref().and_then(|c| c.name.as_deref())
    }
}

/// Channel metadata returned alongside the feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub field1: Option<String>,
    #[serde(default)]
    pub field2: Option<String>,
    #[serde(default)]
    pub field3: Option<String>,
    #[serde(default)]
    pub field4: Option<String>,
    #[serde(default)]
    pub field5: Option<String>,
    #[serde(default)]
    pub field6: Option<String>,
    #[serde(default)]
    pub field7: Option<String>,
    #[serde(default)]
    pub field8: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub last_entry_id: Option<u64>,
}

/// One polling result as returned by the API.
///
/// Every value is optional and may be a string, a number or `null`; the
/// API does not type them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFeedEntry {
    #[serde(default)]
    pub created_at: Option<Value>,
    #[serde(default)]
    pub entry_id: Option<Value>,
    #[serde(default)]
    pub field1: Option<Value>,
    #[serde(default)]
    pub field2: Option<Value>,
    #[serde(default)]
    pub field3: Option<Value>,
    #[serde(default)]
    pub field4: Option<Value>,
    #[serde(default)]
    pub field5: Option<Value>,
    #[serde(default)]
    pub field6: Option<Value>,
    #[serde(default)]
    pub field7: Option<Value>,
    #[serde(default)]
    pub field8: Option<Value>,
}
