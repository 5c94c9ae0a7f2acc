//! AWS SNS publisher over the Query API, signed with SigV4.
//!
//! The link is the message body; `ts` and `channel` travel as String message
//! attributes.

use std::collections::BTreeMap;

use {
    async_trait::async_trait,
    chrono::Utc,
    secrecy::ExposeSecret,
    serde::Deserialize,
    tracing::info,
    unfurler_config::SnsConfig,
    url::Url,
};

use crate::{
    Error, Publisher, Result,
    sigv4::{self, Credentials, Scope},
};

const BACKEND: &str = "sns";
const SERVICE: &str = "sns";
const API_VERSION: &str = "2010-03-31";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

pub struct SnsPublisher {
    http: reqwest::Client,
    endpoint: Url,
    region: String,
    topic_arn: String,
    credentials: Credentials,
}

impl SnsPublisher {
    pub fn new(http: reqwest::Client, config: &SnsConfig) -> Result<Self> {
        let raw = config.resolved_endpoint();
        let endpoint = Url::parse(&raw)
            .map_err(|e| Error::Config(format!("invalid SNS endpoint \"{raw}\": {e}")))?;
        Ok(Self {
            http,
            endpoint,
            region: config.region.clone(),
            topic_arn: config.topic_arn.clone(),
            credentials: Credentials {
                access_key_id: config.access_key_id.clone(),
                secret_access_key: config.secret_access_key.clone(),
                session_token: config.session_token.clone(),
            },
        })
    }

    fn form_body(&self, link: &str, ts: &str, channel: &str) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("Action", "Publish")
            .append_pair("Version", API_VERSION)
            .append_pair("TopicArn", &self.topic_arn)
            .append_pair("Message", link)
            .append_pair("MessageAttributes.entry.1.Name", "ts")
            .append_pair("MessageAttributes.entry.1.Value.DataType", "String")
            .append_pair("MessageAttributes.entry.1.Value.StringValue", ts)
            .append_pair("MessageAttributes.entry.2.Name", "channel")
            .append_pair("MessageAttributes.entry.2.Value.DataType", "String")
            .append_pair("MessageAttributes.entry.2.Value.StringValue", channel)
            .finish()
    }
}

#[async_trait]
impl Publisher for SnsPublisher {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn publish(&self, link: &str, ts: &str, channel: &str) -> Result<String> {
        let body = self.form_body(link, ts, channel);
        let scope = Scope {
            region: &self.region,
            service: SERVICE,
            time: Utc::now(),
        };

        let mut headers = BTreeMap::from([
            ("content-type".to_string(), FORM_CONTENT_TYPE.to_string()),
            ("host".to_string(), sigv4::host_header(&self.endpoint)),
            ("x-amz-date".to_string(), scope.amz_date()),
        ]);
        if let Some(token) = self.credentials.session_token.as_ref() {
            headers.insert(
                "x-amz-security-token".to_string(),
                token.expose_secret().clone(),
            );
        }
        let authorization = sigv4::authorization(
            &self.credentials,
            &scope,
            "POST",
            &self.endpoint,
            &headers,
            body.as_bytes(),
        )?;

        // reqwest derives Host from the URL itself.
        let mut request = self
            .http
            .post(self.endpoint.clone())
            .header("authorization", authorization);
        for (name, value) in headers.iter().filter(|(name, _)| name.as_str() != "host") {
            request = request.header(name.as_str(), value.as_str());
        }

        let resp = request
            .body(body)
            .send()
            .await
            .map_err(|e| Error::transport("sns publish request failed", e))?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::Http {
                backend: BACKEND,
                status: status.as_u16(),
                body: text,
            });
        }

        let message_id = parse_message_id(&text)?;

        info!(backend = BACKEND, message_id = %message_id, link, channel, ts, "posted link");
        Ok(message_id)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PublishResponse {
    publish_result: PublishResult,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PublishResult {
    #[serde(default)]
    message_id: String,
}

/// Read `PublishResult/MessageId` from a `PublishResponse` document.
fn parse_message_id(xml: &str) -> Result<String> {
    let response: PublishResponse =
        quick_xml::de::from_str(xml).map_err(|e| Error::invalid_response(BACKEND, e))?;
    let id = response.publish_result.message_id.trim();
    if id.is_empty() {
        return Err(Error::invalid_response(BACKEND, "empty MessageId in response"));
    }
    Ok(id.to_string())
}
