//! In-memory key and trust stores.
//!
//! # Responsibilities
//! - Hold the certificates and optional private key loaded for one store role
//! - Register them as store entries under the configured alias
//!
//! # Design Decisions
//! - With a private key, certificates form one chain, leaf first, under a single alias
//! - Without one, every certificate is its own entry (`alias`, or `alias-<index>`
//!   when there is more than one)
//! - Built once per client build and never mutated afterwards

use std::fmt;

use rustls::pki_types::PrivateKeyDer;

use crate::config::schema::StoreProperties;
use crate::tls::error::{TlsError, TlsResult};
use crate::tls::pem::{Certificate, PemContent};

pub const DEFAULT_ALIAS: &str = "ssl";
pub const DEFAULT_STORE_TYPE: &str = "PKCS12";

/// Certificates and key material for one store role.
pub struct TrustMaterial {
    store_type: Option<String>,
    alias: Option<String>,
    password: Option<String>,
    certificates: Vec<Certificate>,
    private_key: Option<PrivateKeyDer<'static>>,
}

impl TrustMaterial {
    pub fn new(
        store_type: Option<String>,
        certificates: Vec<Certificate>,
        private_key: Option<PrivateKeyDer<'static>>,
    ) -> TlsResult<Self> {
        if certificates.is_empty() {
            return Err(TlsError::Config("certificates must not be empty".into()));
        }
        Ok(Self {
            store_type,
            alias: None,
            password: None,
            certificates,
            private_key,
        })
    }

    /// Load the store described by `details`; `None` when nothing is configured.
    pub fn load(details: &StoreProperties) -> TlsResult<Option<Self>> {
        if details.is_empty() {
            return Ok(None);
        }
        let Some(certificate) = details.certificate.as_deref().filter(|c| !c.trim().is_empty()) else {
            return Err(TlsError::Config("store certificate is required".into()));
        };
        let certificates = PemContent::load(certificate)?
            .certificates()
            .map_err(|e| TlsError::parse("certificate", e))?;
        let private_key = load_private_key(details)?;
        Self::new(details.store_type.clone(), certificates, private_key).map(Some)
    }

    pub fn with_alias(mut self, alias: Option<String>) -> Self {
        self.alias = alias;
        self
    }

    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }

    pub fn store_type(&self) -> &str {
        self.store_type.as_deref().filter(|t| !t.trim().is_empty()).unwrap_or(DEFAULT_STORE_TYPE)
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    pub fn private_key(&self) -> Option<&PrivateKeyDer<'static>> {
        self.private_key.as_ref()
    }
}

impl fmt::Debug for TrustMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustMaterial")
            .field("store_type", &self.store_type())
            .field("alias", &self.alias)
            .field("certificates", &self.certificates)
            .field("private_key", &self.private_key.is_some())
            .finish()
    }
}

/// Load the private key of `details`, decrypting it with its password if needed.
pub(crate) fn load_private_key(details: &StoreProperties) -> TlsResult<Option<PrivateKeyDer<'static>>> {
    let Some(location) = details.private_key.as_deref().filter(|k| !k.trim().is_empty()) else {
        return Ok(None);
    };
    PemContent::load(location)?
        .private_key(details.private_key_password.as_deref())
        .map_err(|e| TlsError::parse("private-key", e))
}

/// A store entry.
pub enum StoreEntry {
    PrivateKey {
        alias: String,
        key: PrivateKeyDer<'static>,
        password: Option<String>,
        chain: Vec<Certificate>,
    },
    Certificate {
        alias: String,
        certificate: Certificate,
    },
}

impl StoreEntry {
    pub fn alias(&self) -> &str {
        match self {
            StoreEntry::PrivateKey { alias, .. } | StoreEntry::Certificate { alias, .. } => alias,
        }
    }
}

impl fmt::Debug for StoreEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreEntry::PrivateKey { alias, chain, .. } => f
                .debug_struct("PrivateKey")
                .field("alias", alias)
                .field("chain", chain)
                .finish(),
            StoreEntry::Certificate { alias, certificate } => f
                .debug_struct("Certificate")
                .field("alias", alias)
                .field("certificate", certificate)
                .finish(),
        }
    }
}

/// Named collection of key and certificate entries.
#[derive(Debug)]
pub struct KeyStore {
    name: String,
    store_type: String,
    entries: Vec<StoreEntry>,
}

impl KeyStore {
    /// Register `material` as entries of a new store named `name` (`key` or `trust`).
    pub fn from_material(name: &str, material: &TrustMaterial) -> TlsResult<Self> {
        let alias = material
            .alias()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(DEFAULT_ALIAS)
            .to_string();
        let certificates = material.certificates();
        if certificates.is_empty() {
            return Err(TlsError::Store { name: name.into(), reason: "no certificates".into() });
        }

        let entries = match material.private_key() {
            Some(key) => vec![StoreEntry::PrivateKey {
                alias,
                key: key.clone_key(),
                password: material.password().map(str::to_string),
                chain: certificates.to_vec(),
            }],
            None if certificates.len() == 1 => vec![StoreEntry::Certificate {
                alias,
                certificate: certificates[0].clone(),
            }],
            None => certificates
                .iter()
                .enumerate()
                .map(|(index, certificate)| StoreEntry::Certificate {
                    alias: format!("{alias}-{index}"),
                    certificate: certificate.clone(),
                })
                .collect(),
        };

        Ok(Self {
            name: name.to_string(),
            store_type: material.store_type().to_string(),
            entries,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store_type(&self) -> &str {
        &self.store_type
    }

    pub fn entries(&self) -> &[StoreEntry] {
        &self.entries
    }

    /// Key entry under `alias`, or the first key entry when no alias is given.
    pub fn key_entry(&self, alias: Option<&str>) -> Option<(&PrivateKeyDer<'static>, &[Certificate])> {
        self.entries.iter().find_map(|entry| match entry {
            StoreEntry::PrivateKey { alias: entry_alias, key, chain, .. }
                if alias.map_or(true, |a| a == entry_alias.as_str()) =>
            {
                Some((key, chain.as_slice()))
            }
            _ => None,
        })
    }

    /// Every certificate in the store, chains included.
    pub fn certificates(&self) -> impl Iterator<Item = &Certificate> {
        self.entries.iter().flat_map(|entry| match entry {
            StoreEntry::PrivateKey { chain, .. } => chain.iter().collect::<Vec<_>>(),
            StoreEntry::Certificate { certificate, .. } => vec![certificate],
        })
    }
}
