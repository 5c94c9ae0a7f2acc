//! Configuration validation.
//!
//! Checks a loaded [`UnfurlerConfig`] for missing credentials and malformed
//! endpoints before any component is built from it.

use {secrecy::ExposeSecret, unfurler_common::secret::is_blank};

use crate::schema::{QueueConfig, UnfurlerConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "missing", "invalid-url", "security"
    pub category: &'static str,
    /// Dotted path, e.g. "slack.oauth_token"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}: {}",
            self.severity, self.category, self.path, self.message
        )
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(
        &mut self,
        severity: Severity,
        category: &'static str,
        path: &str,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            severity,
            category,
            path: path.to_string(),
            message: message.into(),
        });
    }

    fn missing(&mut self, path: &str, what: &str) {
        self.push(Severity::Error, "missing", path, format!("{what} is required"));
    }
}

/// Validate a configuration.
#[must_use]
pub fn validate(config: &UnfurlerConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    check_route(&mut result, "server.callback_path", &config.server.callback_path);
    check_route(&mut result, "server.push_path", &config.server.push_path);
    if config.server.callback_path == config.server.push_path {
        result.push(
            Severity::Error,
            "invalid-value",
            "server.push_path",
            "must differ from server.callback_path",
        );
    }

    if is_blank(&config.slack.verification_token) {
        result.missing("slack.verification_token", "Slack verification token");
    }
    if is_blank(&config.slack.oauth_token) {
        result.missing("slack.oauth_token", "Slack OAuth token");
    }
    check_url(&mut result, "slack.api_base", &config.slack.api_base);

    let v1 = &config.versionone;
    if v1.base_url.trim().is_empty() {
        result.missing("versionone.base_url", "VersionOne base URL");
    } else {
        check_url(&mut result, "versionone.base_url", &v1.base_url);
        if v1.base_url.starts_with("http://") {
            result.push(
                Severity::Warning,
                "security",
                "versionone.base_url",
                "basic-auth credentials would be sent over plain HTTP",
            );
        }
    }
    if v1.username.trim().is_empty() {
        result.missing("versionone.username", "VersionOne username");
    }
    if is_blank(&v1.password) {
        result.missing("versionone.password", "VersionOne password");
    }
    if v1.asset_types.is_empty() {
        result.push(
            Severity::Warning,
            "missing",
            "versionone.asset_types",
            "no asset types allowed; every link will be rejected",
        );
    }

    match &config.queue {
        QueueConfig::Memory { capacity } => {
            if *capacity == 0 {
                result.push(
                    Severity::Error,
                    "invalid-value",
                    "queue.capacity",
                    "memory queue capacity must be greater than zero",
                );
            }
        },
        QueueConfig::PubSub(pubsub) => {
            if pubsub.project.trim().is_empty() {
                result.missing("queue.project", "Pub/Sub project");
            }
            if pubsub.topic.trim().is_empty() {
                result.missing("queue.topic", "Pub/Sub topic");
            }
            check_url(&mut result, "queue.endpoint", &pubsub.endpoint);
            if pubsub
                .access_token
                .as_ref()
                .is_none_or(|t| t.expose_secret().is_empty())
            {
                check_url(&mut result, "queue.metadata_url", &pubsub.metadata_url);
            }
        },
        QueueConfig::Sns(sns) => {
            if sns.region.trim().is_empty() {
                result.missing("queue.region", "SNS region");
            }
            if sns.topic_arn.trim().is_empty() {
                result.missing("queue.topic_arn", "SNS topic ARN");
            } else if !sns.topic_arn.starts_with("arn:") {
                result.push(
                    Severity::Error,
                    "invalid-value",
                    "queue.topic_arn",
                    format!("\"{}\" is not an ARN", sns.topic_arn),
                );
            }
            if let Some(endpoint) = sns.endpoint.as_deref() {
                check_url(&mut result, "queue.endpoint", endpoint);
            }
            if !sns.has_credentials() {
                result.missing("queue.access_key_id", "AWS access key pair");
            }
        },
    }

    result
}

fn check_route(result: &mut ValidationResult, path: &str, value: &str) {
    if !value.starts_with('/') || value == "/health" {
        result.push(
            Severity::Error,
            "invalid-value",
            path,
            format!("\"{value}\" must be an absolute route other than /health"),
        );
    }
}

fn check_url(result: &mut ValidationResult, path: &str, value: &str) {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {},
        Ok(parsed) => result.push(
            Severity::Error,
            "invalid-url",
            path,
            format!("unsupported scheme \"{}\"", parsed.scheme()),
        ),
        Err(e) => result.push(
            Severity::Error,
            "invalid-url",
            path,
            format!("\"{value}\" is not a valid URL: {e}"),
        ),
    }
}
