//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! config / tls / auth / client produce:
//!     → tracing events with key=..., step=... fields
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → logging.rs subscriber (binary only)
//!     → whatever metrics recorder the embedding application installs
//! ```
//!
//! # Design Decisions
//! - Structured fields over formatted messages
//! - The library never installs global state; binaries call `init_logging`
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
