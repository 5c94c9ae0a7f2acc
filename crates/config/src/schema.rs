//! Config schema types (server, slack, versionone, queue).

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    unfurler_common::secret::{REDACTED, serialize_option_secret, serialize_secret},
};

/// Root configuration, loaded once at process start and immutable afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UnfurlerConfig {
    pub server: ServerConfig,
    pub slack: SlackConfig,
    pub versionone: VersionOneConfig,
    pub queue: QueueConfig,
}

/// HTTP listener settings for `unfurler serve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Route receiving Slack Events API callbacks.
    pub callback_path: String,
    /// Route receiving Pub/Sub push deliveries.
    pub push_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 3000,
            callback_path: "/slack/events".into(),
            push_path: "/queue/pubsub".into(),
        }
    }
}

/// Slack credentials: the Events API verification token and the bot OAuth
/// token used to post unfurls.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Shared secret every inbound callback must carry in `token`.
    #[serde(serialize_with = "serialize_secret")]
    pub verification_token: Secret<String>,

    /// Bearer token for `chat.unfurl`.
    #[serde(serialize_with = "serialize_secret")]
    pub oauth_token: Secret<String>,

    /// Web API base, overridable for tests.
    pub api_base: String,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("verification_token", &REDACTED)
            .field("oauth_token", &REDACTED)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            verification_token: Secret::new(String::new()),
            oauth_token: Secret::new(String::new()),
            api_base: "https://slack.com/api".into(),
        }
    }
}

/// VersionOne instance the shared links point at.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionOneConfig {
    /// Instance base URL, e.g. `https://www1.v1host.com/sample`. Links that
    /// do not start with it are rejected.
    pub base_url: String,
    pub username: String,
    #[serde(serialize_with = "serialize_secret")]
    pub password: Secret<String>,
    /// Asset types that may be unfurled (exact, case-sensitive match).
    pub asset_types: Vec<String>,
}

impl std::fmt::Debug for VersionOneConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionOneConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("asset_types", &self.asset_types)
            .finish()
    }
}

impl Default for VersionOneConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            password: Secret::new(String::new()),
            asset_types: vec!["Story".into(), "Defect".into()],
        }
    }
}

/// Broker the dispatcher publishes to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum QueueConfig {
    /// In-process channel drained by the gateway itself.
    Memory {
        #[serde(default = "default_memory_capacity")]
        capacity: usize,
    },
    #[serde(rename = "pubsub")]
    PubSub(PubSubConfig),
    Sns(SnsConfig),
}

fn default_memory_capacity() -> usize {
    64
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::Memory {
            capacity: default_memory_capacity(),
        }
    }
}

impl QueueConfig {
    /// Short backend name used in logs.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory { .. } => "memory",
            Self::PubSub(_) => "pubsub",
            Self::Sns(_) => "sns",
        }
    }
}

/// Google Cloud Pub/Sub topic settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PubSubConfig {
    pub project: String,
    pub topic: String,
    /// REST endpoint, overridable for the emulator and tests.
    pub endpoint: String,
    /// Static bearer token. When absent the token is fetched from the
    /// metadata server.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_secret"
    )]
    pub access_token: Option<Secret<String>>,
    pub metadata_url: String,
}

impl std::fmt::Debug for PubSubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubSubConfig")
            .field("project", &self.project)
            .field("topic", &self.topic)
            .field("endpoint", &self.endpoint)
            .field("access_token", &self.access_token.as_ref().map(|_| REDACTED))
            .field("metadata_url", &self.metadata_url)
            .finish()
    }
}

impl Default for PubSubConfig {
    fn default() -> Self {
        Self {
            project: String::new(),
            topic: String::new(),
            endpoint: "https://pubsub.googleapis.com".into(),
            access_token: None,
            metadata_url: "http://metadata.google.internal".into(),
        }
    }
}

/// AWS SNS topic settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnsConfig {
    pub region: String,
    pub topic_arn: String,
    /// Overrides `https://sns.{region}.amazonaws.com`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub access_key_id: String,
    #[serde(serialize_with = "serialize_secret")]
    pub secret_access_key: Secret<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_secret"
    )]
    pub session_token: Option<Secret<String>>,
}

impl SnsConfig {
    /// Endpoint the Query API requests are sent to.
    #[must_use]
    pub fn resolved_endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://sns.{}.amazonaws.com", self.region))
    }

    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.access_key_id.is_empty() && !self.secret_access_key.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for SnsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnsConfig")
            .field("region", &self.region)
            .field("topic_arn", &self.topic_arn)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &REDACTED)
            .field("session_token", &self.session_token.as_ref().map(|_| REDACTED))
            .finish()
    }
}

impl Default for SnsConfig {
    fn default() -> Self {
        Self {
            region: String::new(),
            topic_arn: String::new(),
            endpoint: None,
            access_key_id: String::new(),
            secret_access_key: Secret::new(String::new()),
            session_token: None,
        }
    }
}
