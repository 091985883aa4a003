//! Client error types.

use thiserror::Error;

use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::tls::TlsError;

/// Failures of the underlying network client.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Unable to build transport: {0}")]
    Build(String),

    #[error("Invalid url '{0}'")]
    InvalidUrl(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_builder() {
            TransportError::Build(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Errors surfaced to callers of the client manager and adapter clients.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("TLS error: {0}")]
    Tls(#[from] TlsError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The remote rejected the credentials (403 `Invalid Token`).
    #[error("Authentication rejected by {url}: {message}")]
    Authentication { url: String, message: String },

    #[error("No client available for key '{key}'")]
    ClientUnavailable { key: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AdapterResult<T> = Result<T, AdapterError>;
