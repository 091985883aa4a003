//! TLS material subsystem.
//!
//! # Data Flow
//! ```text
//! HttpSettings { skip_ssl, ssl }
//!     → bundle.rs (skip_ssl → insecure bundle, missing ssl → error)
//!     → factory.rs per store role (keystore / truststore)
//!         → content.rs (inline PEM, location, or directory glob)
//!         → pem.rs (certificates + optional private key)
//!     → store.rs (TrustMaterial → KeyStore entries under alias)
//!     → TlsBundle
//!     → client_config.rs (rustls::ClientConfig for the transport)
//! ```
//!
//! # Design Decisions
//! - Certificates are parsed and stored, never validated as chains here
//! - Glob matches are sorted by file name; the first certificate is the leaf
//! - Disabling peer verification is only reachable through `skip_ssl`

pub mod bundle;
pub mod client_config;
pub mod content;
pub mod error;
pub mod factory;
pub mod pem;
pub mod store;

pub use bundle::{create_tls_bundle, TlsBundle, TlsBundleBuilder};
pub use error::{ParseError, TlsError, TlsResult};
pub use factory::{DefaultPemStoreFactory, PemStoreFactory};
pub use pem::{parse_certificates, parse_private_key, Certificate, PemContent};
pub use store::{KeyStore, StoreEntry, TrustMaterial};
