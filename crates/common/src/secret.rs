//! Serde helpers for `secrecy` wrapped config values.

use secrecy::{ExposeSecret, Secret};

/// Serialize a `Secret<String>` by exposing its inner value.
pub fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Serialize an `Option<Secret<String>>` by exposing its inner value.
pub fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

/// Placeholder rendered instead of secret values in `Debug` output.
pub const REDACTED: &str = "[REDACTED]";

/// `true` when the secret holds an empty string.
#[must_use]
pub fn is_blank(secret: &Secret<String>) -> bool {
    secret.expose_secret().trim().is_empty()
}
