//! Structured logging setup.
//!
//! # Responsibilities
//! - Install the global tracing subscriber for binaries
//! - Honour `RUST_LOG`, falling back to a caller supplied filter

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a `fmt` subscriber filtered by `RUST_LOG` or `default_filter`.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(default_filter: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}
