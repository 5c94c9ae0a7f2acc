//! Normalized request/response shape shared by every platform adapter.

use serde_json::Value;

/// One inbound callback as the dispatcher sees it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallbackRequest {
    pub method: String,
    /// Decoded JSON body. `None` when the body was absent, `null` or not JSON.
    pub body: Option<Value>,
}

impl CallbackRequest {
    pub fn new(method: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method: method.into(),
            body: body.filter(|v| !v.is_null()),
        }
    }

    /// Build a request from a raw body. Anything that is not valid JSON is
    /// dropped and later fails verification.
    pub fn from_bytes(method: impl Into<String>, raw: &[u8]) -> Self {
        let body = if raw.is_empty() {
            None
        } else {
            serde_json::from_slice(raw).ok()
        };
        Self::new(method, body)
    }
}

/// Payload handed to [`Responder::send`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Text(String),
    Json(Value),
}

impl ResponseBody {
    /// Wire form: strings verbatim, everything else JSON-serialized.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) | Self::Json(Value::String(text)) => text.clone(),
            Self::Json(value) => value.to_string(),
        }
    }

    #[must_use]
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json(v) if !v.is_string())
    }
}

impl Default for ResponseBody {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// Response side of an invocation.
pub trait Responder: Send {
    /// `true` once [`send`](Self::send) has been called.
    fn headers_sent(&self) -> bool;
    fn status(&mut self, code: u16);
    fn send(&mut self, body: ResponseBody);
}

/// In-memory [`Responder`] that records what the dispatcher answered.
#[derive(Debug, Clone)]
pub struct ResponseRecorder {
    status: u16,
    body: Option<ResponseBody>,
}

impl Default for ResponseRecorder {
    fn default() -> Self {
        Self {
            status: 200,
            body: None,
        }
    }
}

impl ResponseRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn body(&self) -> Option<&ResponseBody> {
        self.body.as_ref()
    }

    /// Recorded status and body; an unsent response has an empty body.
    #[must_use]
    pub fn into_parts(self) -> (u16, ResponseBody) {
        (self.status, self.body.unwrap_or_default())
    }
}

impl Responder for ResponseRecorder {
    fn headers_sent(&self) -> bool {
        self.body.is_some()
    }

    fn status(&mut self, code: u16) {
        self.status = code;
    }

    fn send(&mut self, body: ResponseBody) {
        self.body = Some(body);
    }
}
