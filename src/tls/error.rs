//! TLS material error types.

use std::path::PathBuf;

use thiserror::Error;

/// Malformed PEM, base64 or DER content.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Missing certificates or unrecognized format")]
    NoCertificates,

    #[error("Invalid base64 in PEM block: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid DER certificate: {0}")]
    Der(String),

    #[error("Unsupported private key format: {0}")]
    UnsupportedKey(String),

    #[error("Encrypted private key requires a password")]
    PasswordRequired,

    #[error("Unable to decrypt private key: {0}")]
    KeyDecryption(String),
}

/// Failures while turning SSL properties into a TLS bundle.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("SSL properties are required when skip_ssl is not set")]
    MissingSsl,

    #[error("Property '{property}' cannot contain a directory glob pattern")]
    AmbiguousGlob { property: String },

    #[error("Invalid TLS configuration: {0}")]
    Config(String),

    #[error("Unable to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported PEM location '{0}'")]
    UnsupportedLocation(String),

    #[error("Unable to parse '{property}': {source}")]
    Parse {
        property: String,
        #[source]
        source: ParseError,
    },

    #[error("Unable to create {name} store: {reason}")]
    Store { name: String, reason: String },

    #[error("TLS error: {0}")]
    Rustls(#[from] rustls::Error),
}

impl TlsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TlsError::Io { path: path.into(), source }
    }

    pub(crate) fn parse(property: impl Into<String>, source: ParseError) -> Self {
        TlsError::Parse { property: property.into(), source }
    }
}

pub type TlsResult<T> = Result<T, TlsError>;
