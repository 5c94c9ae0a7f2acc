//! Slack `chat.unfurl` client.

use std::collections::BTreeMap;

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    tracing::debug,
    unfurler_config::SlackConfig,
};

use crate::error::{Result, UnfurlError};

/// Body of a `chat.unfurl` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackUnfurlPayload {
    pub channel: String,
    pub ts: String,
    pub unfurls: BTreeMap<String, UnfurlAttachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnfurlAttachment {
    pub title: String,
    pub text: String,
    pub title_link: String,
}

impl SlackUnfurlPayload {
    /// Payload unfurling a single link.
    pub fn single(
        channel: impl Into<String>,
        ts: impl Into<String>,
        link: &str,
        title: String,
        text: String,
    ) -> Self {
        let attachment = UnfurlAttachment {
            title,
            text,
            title_link: link.to_string(),
        };
        Self {
            channel: channel.into(),
            ts: ts.into(),
            unfurls: BTreeMap::from([(link.to_string(), attachment)]),
        }
    }
}

/// Posts unfurl payloads.
#[async_trait]
pub trait UnfurlPoster: Send + Sync {
    async fn post_unfurl(&self, payload: &SlackUnfurlPayload) -> Result<()>;
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    ok: bool,
}

/// Web API client authenticated with the bot OAuth token.
pub struct SlackClient {
    http: reqwest::Client,
    api_base: String,
    oauth_token: Secret<String>,
}

impl SlackClient {
    pub fn new(http: reqwest::Client, config: &SlackConfig) -> Self {
        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            oauth_token: config.oauth_token.clone(),
        }
    }
}

#[async_trait]
impl UnfurlPoster for SlackClient {
    async fn post_unfurl(&self, payload: &SlackUnfurlPayload) -> Result<()> {
        let url = format!("{}/chat.unfurl", self.api_base);
        debug!(channel = %payload.channel, ts = %payload.ts, "posting unfurl");

        let resp = self
            .http
            .post(url)
            .bearer_auth(self.oauth_token.expose_secret())
            .json(payload)
            .send()
            .await
            .map_err(|e| UnfurlError::transport("Slack request failed", e))?;
        if !resp.status().is_success() {
            return Err(UnfurlError::PostFailed {
                status: resp.status().as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| UnfurlError::transport("reading Slack response failed", e))?;
        match serde_json::from_str::<ApiResponse>(&body) {
            Ok(ApiResponse { ok: true }) => Ok(()),
            _ => Err(UnfurlError::NonOkResponse { body }),
        }
    }
}
