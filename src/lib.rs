//! Hot-reloadable integration adapter clients.
//!
//! Each adapter key resolves to TOML configuration (merged with a common
//! fallback entry) from which a client is built: TLS material from PEM,
//! authorization (basic, static headers or a cached bearer token) and a pooled
//! HTTP transport. Configuration changes rebuild the client on the next
//! `get_client` call without disturbing requests in flight.

pub mod auth;
pub mod client;
pub mod config;
pub mod observability;
pub mod tls;

pub use client::{AdapterClient, AdapterError, AdapterRequest, AdapterResponse, ClientManager};
pub use config::{AdapterProperties, ConfigSnapshot, ConfigSource, MergingConfigSource};
