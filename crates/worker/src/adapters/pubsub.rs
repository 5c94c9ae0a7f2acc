//! Pub/Sub deliveries: push subscriptions and background-function triggers.

use std::collections::HashMap;

use {
    base64::{Engine, engine::general_purpose::STANDARD},
    serde::Deserialize,
    tracing::debug,
    unfurler_common::UnfurlRequest,
};

/// A Pub/Sub message as delivered to subscribers. `data` is base64.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PubSubMessage {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub attributes: Option<HashMap<String, String>>,
    #[serde(default, rename = "messageId", alias = "message_id")]
    pub message_id: Option<String>,
}

/// Body of a push-subscription request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushEnvelope {
    #[serde(default)]
    pub message: PubSubMessage,
    #[serde(default)]
    pub subscription: Option<String>,
}

/// Translate a message. `event_id` is the id the trigger context supplies;
/// when absent the message's own id is used.
#[must_use]
pub fn from_message(message: &PubSubMessage, event_id: Option<&str>) -> UnfurlRequest {
    let attribute = |key: &str| {
        message
            .attributes
            .as_ref()
            .and_then(|attrs| attrs.get(key))
            .cloned()
    };
    UnfurlRequest {
        message_id: event_id
            .map(str::to_string)
            .or_else(|| message.message_id.clone()),
        link: message.data.as_deref().and_then(decode_data),
        ts: attribute("ts"),
        channel: attribute("channel"),
    }
}

#[must_use]
pub fn from_push(envelope: &PushEnvelope) -> UnfurlRequest {
    from_message(&envelope.message, None)
}

fn decode_data(data: &str) -> Option<String> {
    let bytes = STANDARD
        .decode(data)
        .map_err(|e| debug!(error = %e, "message data is not valid base64"))
        .ok()?;
    String::from_utf8(bytes)
        .map_err(|e| debug!(error = %e, "message data is not UTF-8"))
        .ok()
}
