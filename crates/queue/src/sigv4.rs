//! AWS Signature Version 4 request signing.
//!
//! Only what the SNS Query API needs: header-based signing of a request with
//! a fully buffered payload.

use std::collections::BTreeMap;

use {
    chrono::{DateTime, Utc},
    hmac::{Hmac, Mac},
    secrecy::{ExposeSecret, Secret},
    sha2::{Digest, Sha256},
    url::Url,
};

use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Long-term or session credentials.
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: Secret<String>,
    pub session_token: Option<Secret<String>>,
}

/// Region/service scope plus the signing instant.
pub struct Scope<'a> {
    pub region: &'a str,
    pub service: &'a str,
    pub time: DateTime<Utc>,
}

impl Scope<'_> {
    #[must_use]
    pub fn amz_date(&self) -> String {
        self.time.format("%Y%m%dT%H%M%SZ").to_string()
    }

    fn date(&self) -> String {
        self.time.format("%Y%m%d").to_string()
    }

    fn credential_scope(&self) -> String {
        format!(
            "{}/{}/{}/aws4_request",
            self.date(),
            self.region,
            self.service
        )
    }
}

/// `Host` header value for `url`, including a non-default port.
#[must_use]
pub fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Compute the `Authorization` header value.
///
/// `headers` are the headers to sign, keyed by lowercase name; they must
/// include `host` and `x-amz-date`, and the request must be sent with exactly
/// these values.
pub fn authorization(
    credentials: &Credentials,
    scope: &Scope<'_>,
    method: &str,
    url: &Url,
    headers: &BTreeMap<String, String>,
    payload: &[u8],
) -> Result<String> {
    let signed_headers = headers.keys().cloned().collect::<Vec<_>>().join(";");
    let canonical = canonical_request(method, url, headers, &signed_headers, payload);

    let string_to_sign = format!(
        "{ALGORITHM}\n{}\n{}\n{}",
        scope.amz_date(),
        scope.credential_scope(),
        hex::encode(Sha256::digest(canonical.as_bytes()))
    );

    let key = signing_key(credentials.secret_access_key.expose_secret(), scope)?;
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

    Ok(format!(
        "{ALGORITHM} Credential={}/{}, SignedHeaders={signed_headers}, Signature={signature}",
        credentials.access_key_id,
        scope.credential_scope()
    ))
}

fn canonical_request(
    method: &str,
    url: &Url,
    headers: &BTreeMap<String, String>,
    signed_headers: &str,
    payload: &[u8],
) -> String {
    let path = if url.path().is_empty() {
        "/"
    } else {
        url.path()
    };

    let mut query: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (urlencoding::encode(&k).into_owned(), urlencoding::encode(&v).into_owned()))
        .collect();
    query.sort();
    let query = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{}\n", value.trim()))
        .collect();

    format!(
        "{method}\n{path}\n{query}\n{canonical_headers}\n{signed_headers}\n{}",
        hex::encode(Sha256::digest(payload))
    )
}

fn signing_key(secret: &str, scope: &Scope<'_>) -> Result<Vec<u8>> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), scope.date().as_bytes())?;
    let k_region = hmac_sha256(&k_date, scope.region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, scope.service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| Error::Signing {
        message: e.to_string(),
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
