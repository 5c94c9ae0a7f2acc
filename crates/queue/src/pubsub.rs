//! Google Cloud Pub/Sub publisher over the REST API.
//!
//! Envelope: message `data` is the base64 link, `attributes` carry `ts` and
//! `channel`.

use {
    async_trait::async_trait,
    base64::{Engine, engine::general_purpose::STANDARD},
    secrecy::ExposeSecret,
    serde::{Deserialize, Serialize},
    tracing::info,
    unfurler_config::PubSubConfig,
};

use crate::{Error, Publisher, Result, auth::TokenSource};

const BACKEND: &str = "pubsub";

#[derive(Serialize)]
struct PublishRequest<'a> {
    messages: Vec<OutgoingMessage<'a>>,
}

#[derive(Serialize)]
struct OutgoingMessage<'a> {
    data: String,
    attributes: MessageAttributes<'a>,
}

#[derive(Serialize)]
struct MessageAttributes<'a> {
    ts: &'a str,
    channel: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

pub struct PubSubPublisher {
    http: reqwest::Client,
    publish_url: String,
    tokens: TokenSource,
}

impl PubSubPublisher {
    pub fn new(http: reqwest::Client, config: &PubSubConfig) -> Self {
        let publish_url = format!(
            "{}/v1/projects/{}/topics/{}:publish",
            config.endpoint.trim_end_matches('/'),
            urlencoding::encode(&config.project),
            urlencoding::encode(&config.topic),
        );
        Self {
            http,
            publish_url,
            tokens: TokenSource::from_config(config),
        }
    }
}

#[async_trait]
impl Publisher for PubSubPublisher {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn publish(&self, link: &str, ts: &str, channel: &str) -> Result<String> {
        let token = self.tokens.token(&self.http).await?;
        let body = PublishRequest {
            messages: vec![OutgoingMessage {
                data: STANDARD.encode(link.as_bytes()),
                attributes: MessageAttributes { ts, channel },
            }],
        };

        let resp = self
            .http
            .post(&self.publish_url)
            .bearer_auth(token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::transport("pubsub publish request failed", e))?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                backend: BACKEND,
                status,
                body,
            });
        }

        let parsed: PublishResponse = resp
            .json()
            .await
            .map_err(|e| Error::invalid_response(BACKEND, e))?;
        let message_id = parsed
            .message_ids
            .into_iter()
            .next()
            .ok_or_else(|| Error::invalid_response(BACKEND, "no message id returned"))?;

        info!(backend = BACKEND, message_id = %message_id, link, channel, ts, "posted link");
        Ok(message_id)
    }
}
