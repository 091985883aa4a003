//! TLS bundle assembly.
//!
//! # Responsibilities
//! - Decide between the insecure escape hatch (`skip_ssl`) and configured material
//! - Build key and trust material through a [`PemStoreFactory`]
//! - Assemble stores, key alias/password, protocol and allow-lists into a [`TlsBundle`]
//!
//! # Design Decisions
//! - Missing SSL properties without `skip_ssl` is a configuration error, never a
//!   silent fallback to no verification
//! - A bundle is immutable; every client build creates a new one

use crate::config::schema::{HttpSettings, SslProperties, StoreProperties};
use crate::tls::error::{TlsError, TlsResult};
use crate::tls::factory::{DefaultPemStoreFactory, PemStoreFactory};
use crate::tls::store::{KeyStore, TrustMaterial};

/// Everything a transport needs to set up TLS.
#[derive(Debug)]
pub struct TlsBundle {
    key_store: Option<KeyStore>,
    trust_store: Option<KeyStore>,
    key_alias: Option<String>,
    key_password: Option<String>,
    protocol: String,
    ciphers: Vec<String>,
    enabled_protocols: Vec<String>,
    verify_peer: bool,
}

impl TlsBundle {
    /// Empty stores and peer verification disabled.
    pub fn insecure() -> Self {
        Self {
            key_store: None,
            trust_store: None,
            key_alias: None,
            key_password: None,
            protocol: "TLS".to_string(),
            ciphers: Vec::new(),
            enabled_protocols: Vec::new(),
            verify_peer: false,
        }
    }

    pub fn key_store(&self) -> Option<&KeyStore> {
        self.key_store.as_ref()
    }

    pub fn trust_store(&self) -> Option<&KeyStore> {
        self.trust_store.as_ref()
    }

    pub fn key_alias(&self) -> Option<&str> {
        self.key_alias.as_deref()
    }

    pub fn key_password(&self) -> Option<&str> {
        self.key_password.as_deref()
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn ciphers(&self) -> &[String] {
        &self.ciphers
    }

    pub fn enabled_protocols(&self) -> &[String] {
        &self.enabled_protocols
    }

    /// True only for bundles built with `skip_ssl`.
    pub fn is_insecure(&self) -> bool {
        !self.verify_peer
    }
}

/// Builds [`TlsBundle`]s from http settings.
#[derive(Debug, Clone, Default)]
pub struct TlsBundleBuilder<F = DefaultPemStoreFactory> {
    factory: F,
}

impl TlsBundleBuilder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<F: PemStoreFactory> TlsBundleBuilder<F> {
    pub fn with_factory(factory: F) -> Self {
        Self { factory }
    }

    /// Material for one store role, `None` if the role is not configured.
    pub fn build(&self, property_name: &str, details: &StoreProperties) -> TlsResult<Option<TrustMaterial>> {
        self.factory.get_store(property_name, details)
    }

    /// Combine key and trust material with the remaining SSL options.
    pub fn assemble(
        &self,
        key_material: Option<TrustMaterial>,
        trust_material: Option<TrustMaterial>,
        ssl: &SslProperties,
    ) -> TlsResult<TlsBundle> {
        let key_material = key_material.map(|m| {
            m.with_alias(ssl.key.alias.clone())
                .with_password(ssl.key.password.clone())
        });
        let key_store = key_material
            .as_ref()
            .map(|m| KeyStore::from_material("key", m))
            .transpose()?;
        let trust_store = trust_material
            .as_ref()
            .map(|m| KeyStore::from_material("trust", m))
            .transpose()?;

        Ok(TlsBundle {
            key_store,
            trust_store,
            key_alias: ssl.key.alias.clone(),
            key_password: ssl.key.password.clone(),
            protocol: ssl.protocol().to_string(),
            ciphers: ssl.options.ciphers.clone(),
            enabled_protocols: ssl.options.enabled_protocols.clone(),
            verify_peer: true,
        })
    }

    /// Bundle for an adapter's http settings.
    pub fn create(&self, http: &HttpSettings) -> TlsResult<TlsBundle> {
        if http.skip_ssl {
            tracing::warn!("TLS peer verification is disabled by skip_ssl");
            return Ok(TlsBundle::insecure());
        }
        let ssl = http.ssl.as_ref().ok_or(TlsError::MissingSsl)?;

        let key_material = self.build("keystore", &ssl.keystore)?;
        let trust_material = self.build("truststore", &ssl.truststore)?;
        self.assemble(key_material, trust_material, ssl)
    }
}

/// Bundle for `http` with the default store factory.
pub fn create_tls_bundle(http: &HttpSettings) -> TlsResult<TlsBundle> {
    TlsBundleBuilder::new().create(http)
}
