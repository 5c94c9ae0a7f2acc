//! Link to VersionOne asset resolution.

use {unfurler_config::VersionOneConfig, url::Url};

use crate::error::{Result, UnfurlError};

/// Query parameter carrying `AssetType:AssetId`.
pub const OID_TOKEN_PARAM: &str = "oidToken";

/// A VersionOne asset identified by a shared link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub asset_type: String,
    pub id: String,
}

/// Validates links against the configured instance and asset allow-list.
#[derive(Debug, Clone)]
pub struct LinkResolver {
    base_url: String,
    asset_types: Vec<String>,
}

impl LinkResolver {
    pub fn new(base_url: impl Into<String>, asset_types: Vec<String>) -> Self {
        Self {
            base_url: base_url.into(),
            asset_types,
        }
    }

    #[must_use]
    pub fn from_config(config: &VersionOneConfig) -> Self {
        Self::new(config.base_url.clone(), config.asset_types.clone())
    }

    /// Resolve `link` to an asset reference.
    ///
    /// Checks run in order: base URL prefix, `oidToken` presence, both token
    /// parts present, asset type allowed (exact match).
    pub fn resolve(&self, link: &str) -> Result<AssetRef> {
        if self.base_url.is_empty() || !link.starts_with(&self.base_url) {
            return Err(UnfurlError::UnknownBase { link: link.into() });
        }

        let token = oid_token(link).ok_or_else(|| UnfurlError::MissingToken { link: link.into() })?;

        let mut parts = token.split(':');
        let asset_type = parts.next().unwrap_or_default();
        let id = parts.next().unwrap_or_default();
        if asset_type.is_empty() || id.is_empty() {
            return Err(UnfurlError::MissingAssetId { link: link.into() });
        }

        if !self.asset_types.iter().any(|allowed| allowed == asset_type) {
            return Err(UnfurlError::UnsupportedAssetType {
                asset_type: asset_type.into(),
                link: link.into(),
            });
        }

        Ok(AssetRef {
            asset_type: asset_type.into(),
            id: id.into(),
        })
    }
}

/// Percent-decoded `oidToken` value, if the link has one.
fn oid_token(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == OID_TOKEN_PARAM)
        .map(|(_, value)| value.into_owned())
}
