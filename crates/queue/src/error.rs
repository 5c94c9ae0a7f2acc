/// Crate-wide result type for publish operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Publish failures. None of these are retried locally; they propagate to
/// the dispatcher, which fails the whole callback.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Broker answered with a non-success status.
    #[error("{backend} publish failed (HTTP {status}): {body}")]
    Http {
        backend: &'static str,
        status: u16,
        body: String,
    },

    /// Request never produced a response.
    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    /// Broker answered 2xx but the body did not carry a message id.
    #[error("invalid {backend} response: {message}")]
    InvalidResponse {
        backend: &'static str,
        message: String,
    },

    /// Access token could not be obtained.
    #[error("access token request failed: {message}")]
    Auth { message: String },

    /// Request signing failed.
    #[error("request signing failed: {message}")]
    Signing { message: String },

    /// In-process consumer has gone away.
    #[error("memory queue is closed")]
    Closed,

    #[error("invalid queue configuration: {0}")]
    Config(String),
}

impl Error {
    #[must_use]
    pub fn transport(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            context: context.into(),
            source,
        }
    }

    #[must_use]
    pub fn invalid_response(backend: &'static str, message: impl std::fmt::Display) -> Self {
        Self::InvalidResponse {
            backend,
            message: message.to_string(),
        }
    }
}
