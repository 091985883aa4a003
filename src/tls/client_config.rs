//! Conversion of a [`TlsBundle`] into a rustls client configuration.

use std::sync::Arc;

use rustls::crypto::ring;
use rustls::{ClientConfig, RootCertStore, SupportedProtocolVersion};

use crate::tls::bundle::TlsBundle;
use crate::tls::error::{TlsError, TlsResult};

impl TlsBundle {
    /// rustls configuration for this bundle.
    ///
    /// `None` when the transport's own defaults apply: insecure bundles (the
    /// transport disables verification itself) and bundles with nothing configured.
    pub fn client_config(&self) -> TlsResult<Option<ClientConfig>> {
        if self.is_insecure() {
            return Ok(None);
        }
        let restricted = !self.ciphers().is_empty() || !self.enabled_protocols().is_empty();
        if self.key_store().is_none() && self.trust_store().is_none() && !restricted {
            return Ok(None);
        }
        let trust_store = self.trust_store().ok_or_else(|| {
            TlsError::Config("a truststore is required when a keystore or TLS restrictions are configured".into())
        })?;

        let mut provider = ring::default_provider();
        if !self.ciphers().is_empty() {
            let wanted: Vec<String> = self.ciphers().iter().map(|c| normalize_cipher(c)).collect();
            provider
                .cipher_suites
                .retain(|suite| wanted.contains(&normalize_cipher(&format!("{:?}", suite.suite()))));
            if provider.cipher_suites.is_empty() {
                return Err(TlsError::Config(format!(
                    "none of the configured ciphers are supported: {}",
                    self.ciphers().join(", ")
                )));
            }
        }

        let mut roots = RootCertStore::empty();
        for certificate in trust_store.certificates() {
            roots.add(certificate.der().clone())?;
        }

        let builder = ClientConfig::builder_with_provider(Arc::new(provider))
            .with_protocol_versions(&self.protocol_versions()?)?
            .with_root_certificates(roots);

        let config = match self.key_store() {
            None => builder.with_no_client_auth(),
            Some(key_store) => {
                let (key, chain) = key_store.key_entry(self.key_alias()).ok_or_else(|| TlsError::Store {
                    name: key_store.name().to_string(),
                    reason: format!("no private key entry for alias {:?}", self.key_alias()),
                })?;
                let chain = chain.iter().map(|c| c.der().clone()).collect();
                builder.with_client_auth_cert(chain, key.clone_key())?
            }
        };
        Ok(Some(config))
    }

    fn protocol_versions(&self) -> TlsResult<Vec<&'static SupportedProtocolVersion>> {
        let names: Vec<&str> = if !self.enabled_protocols().is_empty() {
            self.enabled_protocols().iter().map(String::as_str).collect()
        } else if protocol_version(self.protocol()).is_some() {
            vec![self.protocol()]
        } else {
            return Ok(rustls::DEFAULT_VERSIONS.to_vec());
        };

        names
            .into_iter()
            .map(|name| {
                protocol_version(name)
                    .ok_or_else(|| TlsError::Config(format!("unsupported TLS protocol '{name}'")))
            })
            .collect()
    }
}

fn protocol_version(name: &str) -> Option<&'static SupportedProtocolVersion> {
    match name.trim().to_ascii_uppercase().replace(['V', '_'], "").as_str() {
        "TLS1.2" => Some(&rustls::version::TLS12),
        "TLS1.3" => Some(&rustls::version::TLS13),
        _ => None,
    }
}

/// `TLS13_AES_128_GCM_SHA256` and `TLS_AES_128_GCM_SHA256` name the same suite.
fn normalize_cipher(name: &str) -> String {
    name.trim().to_ascii_uppercase().replacen("TLS13_", "TLS_", 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{HttpSettings, SslOptions, SslProperties, StoreProperties};
    use crate::tls::bundle::create_tls_bundle;

    const EC_CERT: &str = include_str!("../../tests/fixtures/ec_cert.pem");
    const EC_PKCS8: &str = include_str!("../../tests/fixtures/ec_pkcs8.key");

    fn bundle(ssl: SslProperties) -> TlsBundle {
        create_tls_bundle(&HttpSettings { ssl: Some(ssl), ..Default::default() }).unwrap()
    }

    fn trust_only() -> SslProperties {
        SslProperties {
            truststore: StoreProperties { certificate: Some(EC_CERT.into()), ..Default::default() },
            ..Default::default()
        }
    }

    #[test]
    fn test_insecure_and_empty_bundles_use_defaults() {
        assert!(TlsBundle::insecure().client_config().unwrap().is_none());
        assert!(bundle(SslProperties::default()).client_config().unwrap().is_none());
    }

    #[test]
    fn test_trust_store_only() {
        assert!(bundle(trust_only()).client_config().unwrap().is_some());
    }

    #[test]
    fn test_mutual_tls() {
        let mut ssl = trust_only();
        ssl.keystore = StoreProperties {
            certificate: Some(EC_CERT.into()),
            private_key: Some(EC_PKCS8.into()),
            ..Default::default()
        };
        let config = bundle(ssl).client_config().unwrap().unwrap();
        assert!(config.client_auth_cert_resolver.has_certs());
    }

    #[test]
    fn test_keystore_without_truststore_is_rejected() {
        let ssl = SslProperties {
            keystore: StoreProperties {
                certificate: Some(EC_CERT.into()),
                private_key: Some(EC_PKCS8.into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(bundle(ssl).client_config(), Err(TlsError::Config(_))));
    }

    #[test]
    fn test_cipher_and_protocol_restrictions() {
        let mut ssl = trust_only();
        ssl.options = SslOptions {
            ciphers: vec!["TLS_AES_256_GCM_SHA384".into()],
            enabled_protocols: vec!["TLSv1.3".into()],
        };
        assert!(bundle(ssl.clone()).client_config().unwrap().is_some());

        ssl.options.ciphers = vec!["TLS_RSA_WITH_RC4_128_MD5".into()];
        assert!(matches!(bundle(ssl.clone()).client_config(), Err(TlsError::Config(_))));

        ssl.options = SslOptions { ciphers: vec![], enabled_protocols: vec!["SSLv3".into()] };
        assert!(matches!(bundle(ssl).client_config(), Err(TlsError::Config(_))));
    }

    #[test]
    fn test_protocol_names() {
        assert!(protocol_version("TLSv1.2").is_some());
        assert!(protocol_version("tlsv1.3").is_some());
        assert!(protocol_version("TLS").is_none());
    }
}
