//! `${VAR}` references in secret fields.
//!
//! A secret whose whole value is `${NAME}` is read from the environment once
//! the file has been parsed. Every other value is taken literally.

use {
    secrecy::{ExposeSecret, Secret},
    tracing::warn,
};

use crate::schema::{QueueConfig, UnfurlerConfig};

/// Resolve secret references against the process environment.
pub fn resolve_secret_refs(config: &mut UnfurlerConfig) {
    resolve_secret_refs_with(config, |name| std::env::var(name).ok());
}

fn resolve_secret_refs_with(config: &mut UnfurlerConfig, lookup: impl Fn(&str) -> Option<String>) {
    resolve("slack.verification_token", &mut config.slack.verification_token, &lookup);
    resolve("slack.oauth_token", &mut config.slack.oauth_token, &lookup);
    resolve("versionone.password", &mut config.versionone.password, &lookup);

    match &mut config.queue {
        QueueConfig::Memory { .. } => {},
        QueueConfig::PubSub(pubsub) => {
            if let Some(token) = pubsub.access_token.as_mut() {
                resolve("queue.access_token", token, &lookup);
            }
        },
        QueueConfig::Sns(sns) => {
            resolve("queue.secret_access_key", &mut sns.secret_access_key, &lookup);
            if let Some(token) = sns.session_token.as_mut() {
                resolve("queue.session_token", token, &lookup);
            }
        },
    }
}

/// An unset variable blanks the secret so validation reports it as missing
/// instead of accepting the literal placeholder.
fn resolve(
    path: &str,
    secret: &mut Secret<String>,
    lookup: &impl Fn(&str) -> Option<String>,
) {
    let Some(name) = reference_name(secret.expose_secret()).map(str::to_owned) else {
        return;
    };
    match lookup(&name) {
        Some(value) => *secret = Secret::new(value),
        None => {
            warn!(path, var = %name, "secret references an unset environment variable");
            *secret = Secret::new(String::new());
        },
    }
}

fn reference_name(value: &str) -> Option<&str> {
    let name = value.trim().strip_prefix("${")?.strip_suffix('}')?;
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some(name)
}
