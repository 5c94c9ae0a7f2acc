use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    error::{Error, Result},
    schema::{QueueConfig, UnfurlerConfig},
    secret_refs::resolve_secret_refs,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "unfurler.toml",
    "unfurler.yaml",
    "unfurler.yml",
    "unfurler.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<UnfurlerConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = parse_config(&raw, path).map_err(|source| Error::Invalid {
        path: path.to_path_buf(),
        source: Box::new(source),
    })?;
    resolve_secret_refs(&mut config);
    Ok(config)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./unfurler.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/unfurler/unfurler.{toml,yaml,yml,json}` (user-global)
///
/// Returns `UnfurlerConfig::default()` if no config file is found. Environment
/// overrides are applied in every case.
pub fn discover_and_load() -> UnfurlerConfig {
    let config = if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                UnfurlerConfig::default()
            },
        }
    } else {
        debug!("no config file found, using defaults");
        UnfurlerConfig::default()
    };
    apply_env_overrides(config)
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    if let Some(dirs) = directories::ProjectDirs::from("", "", "unfurler") {
        let config_dir = dirs.config_dir();
        for name in CONFIG_FILENAMES {
            let p = config_dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Apply `UNFURLER_*` (and standard `AWS_*`) environment variables on top of
/// a loaded config.
pub fn apply_env_overrides(config: UnfurlerConfig) -> UnfurlerConfig {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

fn apply_env_overrides_with(
    mut config: UnfurlerConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> UnfurlerConfig {
    let lookup = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = lookup("UNFURLER_SLACK_TOKEN") {
        config.slack.verification_token = Secret::new(v);
    }
    if let Some(v) = lookup("UNFURLER_SLACK_OAUTH_TOKEN") {
        config.slack.oauth_token = Secret::new(v);
    }
    if let Some(v) = lookup("UNFURLER_V1_URL_BASE") {
        config.versionone.base_url = v;
    }
    if let Some(v) = lookup("UNFURLER_V1_USER") {
        config.versionone.username = v;
    }
    if let Some(v) = lookup("UNFURLER_V1_PASSWORD") {
        config.versionone.password = Secret::new(v);
    }

    match &mut config.queue {
        QueueConfig::Memory { .. } => {},
        QueueConfig::PubSub(pubsub) => {
            if let Some(v) = lookup("UNFURLER_PUBSUB_PROJECT") {
                pubsub.project = v;
            }
            if let Some(v) = lookup("UNFURLER_PUBSUB_TOPIC") {
                pubsub.topic = v;
            }
        },
        QueueConfig::Sns(sns) => {
            if let Some(v) = lookup("UNFURLER_SNS_REGION") {
                sns.region = v;
            }
            if let Some(v) = lookup("UNFURLER_SNS_TOPIC_ARN") {
                sns.topic_arn = v;
            }
            if let Some(v) = lookup("AWS_ACCESS_KEY_ID") {
                sns.access_key_id = v;
            }
            if let Some(v) = lookup("AWS_SECRET_ACCESS_KEY") {
                sns.secret_access_key = Secret::new(v);
            }
            if let Some(v) = lookup("AWS_SESSION_TOKEN") {
                sns.session_token = Some(Secret::new(v));
            }
        },
    }

    config
}

fn parse_config(raw: &str, path: &Path) -> Result<UnfurlerConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(Error::UnsupportedFormat(ext.to_string())),
    }
}
