//! VersionOne REST lookup.

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    serde_json::Value,
    tracing::debug,
    unfurler_config::VersionOneConfig,
};

use crate::{
    asset::AssetRef,
    error::{Result, UnfurlError},
};

/// Read access to VersionOne assets.
#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn fetch(&self, asset: &AssetRef) -> Result<V1Asset>;
}

/// Asset document as returned by `rest-1.v1/Data` with
/// `Accept=application/json`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct V1Asset {
    #[serde(rename = "Attributes", default)]
    pub attributes: Option<V1Attributes>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct V1Attributes {
    #[serde(rename = "Number", default)]
    pub number: Option<V1Attribute>,
    #[serde(rename = "Name", default)]
    pub name: Option<V1Attribute>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct V1Attribute {
    #[serde(default)]
    pub value: Value,
}

impl V1Attribute {
    /// Attribute value as text; `None` only for null. An empty string is a
    /// present value.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        match &self.value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl V1Asset {
    /// Asset number, e.g. `S-01234`.
    #[must_use]
    pub fn number(&self) -> Option<String> {
        self.attributes.as_ref()?.number.as_ref()?.text()
    }

    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.attributes.as_ref()?.name.as_ref()?.text()
    }
}

/// HTTP Basic authenticated client for one VersionOne instance.
pub struct VersionOneClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: Secret<String>,
}

impl VersionOneClient {
    pub fn new(http: reqwest::Client, config: &VersionOneConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }

    fn asset_url(&self, asset: &AssetRef) -> String {
        format!(
            "{}/rest-1.v1/Data/{}/{}?Accept=application/json&sel=Name,Number",
            self.base_url,
            urlencoding::encode(&asset.asset_type),
            urlencoding::encode(&asset.id),
        )
    }
}

#[async_trait]
impl AssetSource for VersionOneClient {
    async fn fetch(&self, asset: &AssetRef) -> Result<V1Asset> {
        let url = self.asset_url(asset);
        debug!(asset_type = %asset.asset_type, id = %asset.id, "fetching VersionOne asset");

        let resp = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .send()
            .await
            .map_err(|e| UnfurlError::transport("VersionOne request failed", e))?;
        if !resp.status().is_success() {
            return Err(UnfurlError::ExternalFetchFailed {
                status: resp.status().as_u16(),
            });
        }

        resp.json()
            .await
            .map_err(|e| UnfurlError::invalid_response("VersionOne", e))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, mockito::Matcher, serde_json::json};

    fn client(base_url: String) -> VersionOneClient {
        VersionOneClient::new(reqwest::Client::new(), &VersionOneConfig {
            base_url,
            username: "admin".into(),
            password: Secret::new("secret".into()),
            ..Default::default()
        })
    }

    fn story() -> AssetRef {
        AssetRef {
            asset_type: "Story".into(),
            id: "55555".into(),
        }
    }

    #[tokio::test]
    async fn fetches_with_basic_auth_and_selection() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest-1.v1/Data/Story/55555")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("Accept".into(), "application/json".into()),
                Matcher::UrlEncoded("sel".into(), "Name,Number".into()),
            ]))
            // admin:secret
            .match_header("authorization", "Basic YWRtaW46c2VjcmV0")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"Attributes": {"Number": {"value": "55555"}, "Name": {"value": "Login bug"}}})
                    .to_string(),
            )
            .create_async()
            .await;

        let asset = client(server.url()).fetch(&story()).await.unwrap();
        assert_eq!(asset.number().as_deref(), Some("55555"));
        assert_eq!(asset.name().as_deref(), Some("Login bug"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_carries_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest-1.v1/Data/Story/55555")
            .match_query(Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let err = client(server.url()).fetch(&story()).await.unwrap_err();
        assert!(matches!(err, UnfurlError::ExternalFetchFailed { status: 401 }));
    }

    #[tokio::test]
    async fn non_json_body_is_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest-1.v1/Data/Story/55555")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>login</html>")
            .create_async()
            .await;

        let err = client(server.url()).fetch(&story()).await.unwrap_err();
        assert!(matches!(err, UnfurlError::InvalidResponse { .. }));
    }

    #[test]
    fn attribute_text() {
        let asset: V1Asset = serde_json::from_value(json!({
            "Attributes": {"Number": {"value": 42}, "Name": {"value": null}}
        }))
        .unwrap();
        assert_eq!(asset.number().as_deref(), Some("42"));
        assert_eq!(asset.name(), None);
        assert_eq!(V1Asset::default().number(), None);

        let blank: V1Asset = serde_json::from_value(json!({
            "Attributes": {"Number": {"value": "S-1"}, "Name": {"value": ""}}
        }))
        .unwrap();
        assert_eq!(blank.name().as_deref(), Some(""));
    }
}
