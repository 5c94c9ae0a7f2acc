//! The unfurl pipeline for one queued link.

use std::sync::Arc;

use {
    tracing::{error, info},
    unfurler_common::UnfurlRequest,
    unfurler_config::UnfurlerConfig,
};

use crate::{
    asset::LinkResolver,
    error::{Result, UnfurlError},
    slack::{SlackClient, SlackUnfurlPayload, UnfurlPoster},
    versionone::{AssetSource, VersionOneClient},
};

/// What a successful invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfurlOutcome {
    /// The unfurl was accepted by Slack.
    Posted,
    /// The delivery carried no link; nothing was fetched or posted.
    NoData,
}

/// Resolves a link, looks the asset up and posts the unfurl. Stateless
/// apart from its injected clients.
#[derive(Clone)]
pub struct UnfurlWorker {
    resolver: LinkResolver,
    assets: Arc<dyn AssetSource>,
    poster: Arc<dyn UnfurlPoster>,
}

impl UnfurlWorker {
    pub fn new(
        resolver: LinkResolver,
        assets: Arc<dyn AssetSource>,
        poster: Arc<dyn UnfurlPoster>,
    ) -> Self {
        Self {
            resolver,
            assets,
            poster,
        }
    }

    /// Worker backed by the real VersionOne and Slack clients.
    #[must_use]
    pub fn from_config(config: &UnfurlerConfig, http: reqwest::Client) -> Self {
        Self::new(
            LinkResolver::from_config(&config.versionone),
            Arc::new(VersionOneClient::new(http.clone(), &config.versionone)),
            Arc::new(SlackClient::new(http, &config.slack)),
        )
    }

    /// Process one delivery. Any failure past the "no data" check is
    /// returned as-is; the worker never retries.
    pub async fn unfurl(&self, request: &UnfurlRequest) -> Result<UnfurlOutcome> {
        let message_id = request.message_id_or_unknown();
        let channel = request.channel.as_deref().unwrap_or_default();
        let ts = request.ts.as_deref().unwrap_or_default();
        info!(
            message_id,
            link = request.link.as_deref().unwrap_or_default(),
            channel,
            ts,
            "processing link"
        );

        let Some(link) = request.link.as_deref().filter(|l| !l.is_empty()) else {
            error!(message_id, "message has no data");
            return Ok(UnfurlOutcome::NoData);
        };

        let asset_ref = self.resolver.resolve(link)?;
        let asset = self.assets.fetch(&asset_ref).await?;

        let (Some(title), Some(text)) = (asset.number(), asset.name()) else {
            return Err(UnfurlError::DetailExtractionFailed { link: link.into() });
        };

        let payload = SlackUnfurlPayload::single(channel, ts, link, title, text);
        self.poster.post_unfurl(&payload).await?;

        info!(message_id, link, channel, ts, "unfurl posted");
        Ok(UnfurlOutcome::Posted)
    }
}
