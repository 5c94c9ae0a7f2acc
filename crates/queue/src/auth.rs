//! Bearer tokens for the Pub/Sub REST API.

use std::time::{Duration, Instant};

use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tokio::sync::Mutex,
    tracing::debug,
    unfurler_config::PubSubConfig,
};

use crate::{Error, Result};

const METADATA_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Clone)]
pub struct CachedAccessToken {
    pub token: Secret<String>,
    pub expires_at: Instant,
}

impl CachedAccessToken {
    fn is_valid(&self) -> bool {
        let refresh_skew = Duration::from_secs(60);
        self.expires_at > Instant::now() + refresh_skew
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

/// Where publish requests get their bearer token from.
pub enum TokenSource {
    /// Token supplied by configuration, used as-is.
    Static(Secret<String>),
    /// Token fetched from the instance metadata server and cached until
    /// shortly before it expires.
    Metadata {
        base_url: String,
        cache: Mutex<Option<CachedAccessToken>>,
    },
}

impl TokenSource {
    #[must_use]
    pub fn from_config(config: &PubSubConfig) -> Self {
        match config.access_token.as_ref() {
            Some(token) if !token.expose_secret().is_empty() => Self::Static(token.clone()),
            _ => Self::Metadata {
                base_url: config.metadata_url.trim_end_matches('/').to_string(),
                cache: Mutex::new(None),
            },
        }
    }

    pub async fn token(&self, client: &reqwest::Client) -> Result<Secret<String>> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::Metadata { base_url, cache } => {
                get_metadata_token(client, base_url, cache).await
            },
        }
    }
}

/// Fetch a token from the metadata server, reusing the cached one while valid.
///
/// The lock is not held across the request: two concurrent first calls may
/// both fetch, and the later write simply replaces the earlier token.
async fn get_metadata_token(
    client: &reqwest::Client,
    base_url: &str,
    cache: &Mutex<Option<CachedAccessToken>>,
) -> Result<Secret<String>> {
    {
        let guard = cache.lock().await;
        if let Some(token) = guard.as_ref()
            && token.is_valid()
        {
            return Ok(token.token.clone());
        }
    }

    let url = format!("{base_url}{METADATA_TOKEN_PATH}");
    debug!(url = %url, "fetching pubsub access token");
    let resp = client
        .get(url)
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .map_err(|e| Error::Auth {
            message: e.to_string(),
        })?;
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Auth {
            message: format!("metadata server responded {status}: {body}"),
        });
    }

    let body: TokenResponse = resp.json().await.map_err(|e| Error::Auth {
        message: format!("malformed token response: {e}"),
    })?;
    let ttl = body.expires_in.unwrap_or(3600).max(120);
    let cached = CachedAccessToken {
        token: Secret::new(body.access_token),
        expires_at: Instant::now() + Duration::from_secs(ttl),
    };
    let token = cached.token.clone();

    let mut guard = cache.lock().await;
    *guard = Some(cached);
    Ok(token)
}
