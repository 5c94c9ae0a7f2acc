//! Message shapes shared by the dispatcher, the queue backends and the worker.

use serde::{Deserialize, Serialize};

/// The unit published to the broker for each shared link.
///
/// Carries no identity of its own; brokers assign a message id on publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedLinkMessage {
    pub link: String,
    pub ts: String,
    pub channel: String,
}

impl QueuedLinkMessage {
    pub fn new(link: impl Into<String>, ts: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            ts: ts.into(),
            channel: channel.into(),
        }
    }
}

/// Worker-side canonical form of one queued delivery.
///
/// Platform adapters produce this from whatever envelope their broker
/// delivers. Missing fields stay `None`; the worker decides what an absent
/// link or channel means.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnfurlRequest {
    pub message_id: Option<String>,
    pub link: Option<String>,
    pub ts: Option<String>,
    pub channel: Option<String>,
}

impl UnfurlRequest {
    /// Message id for log lines, `"unknown"` when the broker supplied none.
    #[must_use]
    pub fn message_id_or_unknown(&self) -> &str {
        self.message_id.as_deref().unwrap_or("unknown")
    }
}

impl QueuedLinkMessage {
    /// Pair the message with the id its broker assigned.
    #[must_use]
    pub fn into_request(self, message_id: impl Into<String>) -> UnfurlRequest {
        UnfurlRequest {
            message_id: Some(message_id.into()),
            link: Some(self.link),
            ts: Some(self.ts),
            channel: Some(self.channel),
        }
    }
}
