//! Configuration error types.

use thiserror::Error;

use crate::config::validation::ValidationError;

/// Errors raised while loading, merging or validating adapter configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Adapter config for key '{key}' is not found")]
    NotFound { key: String },

    /// The stored entry for a key cannot be turned into adapter properties.
    #[error("Adapter config for key '{key}' cannot be merged: {source}")]
    Merge {
        key: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

fn join(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
