//! Serverless HTTP-event adapter (API Gateway proxy style).
//!
//! The platform delivers `{httpMethod, body, isBase64Encoded}` and expects
//! `{statusCode, body}` back.

use {
    base64::{Engine, engine::general_purpose::STANDARD},
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::{
    dispatcher::Dispatcher,
    error::DispatchError,
    request::{CallbackRequest, ResponseRecorder},
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpEvent {
    #[serde(default)]
    pub http_method: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
    /// Payload format 2.0 carries the method here instead.
    #[serde(default)]
    pub request_context: Option<RequestContext>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub http: Option<HttpContext>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpContext {
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpEventResponse {
    pub status_code: u16,
    pub body: String,
}

impl HttpEvent {
    fn method(&self) -> &str {
        self.http_method
            .as_deref()
            .or_else(|| {
                self.request_context
                    .as_ref()?
                    .http
                    .as_ref()?
                    .method
                    .as_deref()
            })
            .unwrap_or_default()
    }
}

/// Build the normalized request. An absent, undecodable or non-JSON body
/// becomes `body: None`.
#[must_use]
pub fn to_request(event: &HttpEvent) -> CallbackRequest {
    let raw = match event.body.as_deref() {
        Some(body) if event.is_base64_encoded => match STANDARD.decode(body) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(error = %e, "discarding body that is not valid base64");
                Vec::new()
            },
        },
        Some(body) => body.as_bytes().to_vec(),
        None => Vec::new(),
    };
    CallbackRequest::from_bytes(event.method(), &raw)
}

/// Translate what the dispatcher recorded into the platform response.
#[must_use]
pub fn to_response(recorder: ResponseRecorder) -> HttpEventResponse {
    let (status_code, body) = recorder.into_parts();
    HttpEventResponse {
        status_code,
        body: body.render(),
    }
}

/// Run one HTTP event through the dispatcher.
pub async fn handle(
    dispatcher: &Dispatcher,
    event: &HttpEvent,
) -> Result<HttpEventResponse, DispatchError> {
    let request = to_request(event);
    let mut recorder = ResponseRecorder::new();
    dispatcher.handle(&request, &mut recorder).await?;
    Ok(to_response(recorder))
}
