//! Adapter client subsystem.
//!
//! # Data Flow
//! ```text
//! caller → manager.rs get_client(key)
//!     → ConfigSource::fetch(key) → ConfigSnapshot { properties, refresh }
//!     → unchanged (or runtime = false): active client from registry.rs
//!     → changed: per-key lock
//!         → validate → tls bundle → RequestAuth → TransportFactory
//!         → adapter.rs AdapterClient (interceptor chain + transport)
//!         → registry.rs publish (atomic replace)
//!         → on failure: keep the previous client
//!
//! caller → AdapterClient::send(request)
//!     → interceptor.rs (request id, default headers, auth, logging)
//!     → transport.rs (reqwest)
//!     → AdapterResponse
//! ```
//!
//! # Design Decisions
//! - Clients are immutable; a rebuild publishes a new one and in-flight
//!   requests finish on the one they started with
//! - The transport sits behind a trait so tests run without sockets

pub mod adapter;
pub mod error;
pub mod interceptor;
pub mod manager;
pub mod registry;
pub mod transport;
pub mod types;

pub use adapter::AdapterClient;
pub use error::{AdapterError, AdapterResult, TransportError};
pub use interceptor::Interceptor;
pub use manager::ClientManager;
pub use registry::ClientRegistry;
pub use transport::{ReqwestTransport, ReqwestTransportFactory, Transport, TransportFactory};
pub use types::{AdapterRequest, AdapterResponse};
