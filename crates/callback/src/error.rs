/// Failures the dispatcher classifies itself. Each maps to an HTTP status and
/// is answered directly when no response has been sent yet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallbackError {
    #[error("method {method} not allowed")]
    MethodNotAllowed { method: String },

    #[error("verification token mismatch")]
    Unauthorized,

    #[error("unsupported callback type: {}", display_kind(.kind))]
    UnsupportedCallback { kind: Option<String> },

    #[error("unsupported event type: {}", display_kind(.kind))]
    UnsupportedEvent { kind: Option<String> },

    #[error("invalid {kind} event: {message}")]
    InvalidEvent { kind: &'static str, message: String },
}

fn display_kind(kind: &Option<String>) -> &str {
    kind.as_deref().unwrap_or("<missing>")
}

impl CallbackError {
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MethodNotAllowed { .. } => 405,
            Self::Unauthorized => 401,
            Self::UnsupportedCallback { .. }
            | Self::UnsupportedEvent { .. }
            | Self::InvalidEvent { .. } => 400,
        }
    }

    #[must_use]
    pub fn method_not_allowed(method: impl Into<String>) -> Self {
        Self::MethodNotAllowed {
            method: method.into(),
        }
    }
}

/// Everything `Dispatcher::handle` can return to its caller.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A classified rejection that could not be answered because a response
    /// had already been sent.
    #[error(transparent)]
    Rejected(#[from] CallbackError),

    /// At least one link failed to publish. Never turned into a status by
    /// the dispatcher; the host decides.
    #[error("failed to publish shared link: {0}")]
    Publish(#[from] unfurler_queue::Error),
}
