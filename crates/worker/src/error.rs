pub type Result<T> = std::result::Result<T, UnfurlError>;

/// Everything that can fail one unfurl. All variants are fatal to the
/// invocation; retry is left to the host's redelivery.
#[derive(Debug, thiserror::Error)]
pub enum UnfurlError {
    #[error("link {link} is not under the VersionOne base URL")]
    UnknownBase { link: String },

    #[error("could not extract oidToken from {link}")]
    MissingToken { link: String },

    #[error("asset id is missing in {link}")]
    MissingAssetId { link: String },

    #[error("asset type {asset_type} is not supported ({link})")]
    UnsupportedAssetType { asset_type: String, link: String },

    #[error("VersionOne responded with HTTP {status}")]
    ExternalFetchFailed { status: u16 },

    #[error("could not extract details for {link}")]
    DetailExtractionFailed { link: String },

    #[error("failed to post Slack unfurl: HTTP {status}")]
    PostFailed { status: u16 },

    #[error("Slack API responded with non-OK: {body}")]
    NonOkResponse { body: String },

    #[error("{context}: {source}")]
    Transport {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid {context} response: {message}")]
    InvalidResponse {
        context: &'static str,
        message: String,
    },
}

impl UnfurlError {
    #[must_use]
    pub fn transport(context: &'static str, source: reqwest::Error) -> Self {
        Self::Transport { context, source }
    }

    #[must_use]
    pub fn invalid_response(context: &'static str, message: impl std::fmt::Display) -> Self {
        Self::InvalidResponse {
            context,
            message: message.to_string(),
        }
    }
}
