//! Callback and event kinds the dispatcher understands.

use {serde::Deserialize, serde_json::Value};

use crate::error::CallbackError;

/// Top-level `type` of an Events API callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    UrlVerification,
    EventCallback,
}

impl CallbackKind {
    /// Resolve the `type` field of a callback body.
    pub fn from_body(body: &Value) -> Result<Self, CallbackError> {
        match body.get("type").and_then(Value::as_str) {
            Some("url_verification") => Ok(Self::UrlVerification),
            Some("event_callback") => Ok(Self::EventCallback),
            _ => Err(CallbackError::UnsupportedCallback {
                kind: type_name(body),
            }),
        }
    }
}

/// `event.type` of an `event_callback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    LinkShared,
}

impl EventKind {
    pub const LINK_SHARED: &'static str = "link_shared";

    /// Resolve the `type` field of the inner event; `event` may be absent.
    pub fn from_event(event: Option<&Value>) -> Result<Self, CallbackError> {
        match event.and_then(|e| e.get("type")).and_then(Value::as_str) {
            Some(Self::LINK_SHARED) => Ok(Self::LinkShared),
            _ => Err(CallbackError::UnsupportedEvent {
                kind: event.and_then(type_name),
            }),
        }
    }
}

fn type_name(value: &Value) -> Option<String> {
    match value.get("type")? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// A `link_shared` event. Slack omits `links` for some message subtypes, so
/// it defaults to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LinkSharedEvent {
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub message_ts: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub links: Vec<SharedLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SharedLink {
    pub url: String,
    #[serde(default)]
    pub domain: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<SharedLink>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<SharedLink>>::deserialize(deserializer)?.unwrap_or_default())
}

impl LinkSharedEvent {
    pub fn from_value(event: &Value) -> Result<Self, CallbackError> {
        Self::deserialize(event).map_err(|e| CallbackError::InvalidEvent {
            kind: EventKind::LINK_SHARED,
            message: e.to_string(),
        })
    }
}
