//! Configuration loading, secret references, env overrides, and validation.
//!
//! Config files: `unfurler.toml`, `unfurler.yaml`, or `unfurler.json`
//! Searched in `./` then `~/.config/unfurler/`.
//!
//! Secret fields may hold a `${ENV_VAR}` reference instead of the value.

pub mod error;
pub mod loader;
pub mod schema;
pub mod secret_refs;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, discover_and_load, find_config_file, load_config},
    schema::{
        PubSubConfig, QueueConfig, ServerConfig, SlackConfig, SnsConfig, UnfurlerConfig,
        VersionOneConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
