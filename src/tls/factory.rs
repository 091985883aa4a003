//! Store construction from bundle properties, including directory globs.

use crate::config::schema::StoreProperties;
use crate::tls::content::BundleContentProperty;
use crate::tls::error::{TlsError, TlsResult};
use crate::tls::pem::{Certificate, PemContent};
use crate::tls::store::{load_private_key, TrustMaterial};

/// Builds the material for one store role (`keystore` / `truststore`).
pub trait PemStoreFactory: Send + Sync {
    fn get_store(&self, property_name: &str, details: &StoreProperties) -> TlsResult<Option<TrustMaterial>>;
}

/// Default factory: plain properties load directly, a glob certificate
/// property concatenates every matching file in name order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPemStoreFactory;

impl PemStoreFactory for DefaultPemStoreFactory {
    fn get_store(&self, property_name: &str, details: &StoreProperties) -> TlsResult<Option<TrustMaterial>> {
        let key_property = format!("{property_name}.private-key");
        let private_key = BundleContentProperty::new(&key_property, details.private_key.as_deref());
        if private_key.is_directory_glob() {
            return Err(TlsError::AmbiguousGlob { property: key_property });
        }

        let cert_property = format!("{property_name}.certificate");
        let certificate = BundleContentProperty::new(&cert_property, details.certificate.as_deref());
        if !certificate.is_directory_glob() {
            return TrustMaterial::load(details);
        }

        let mut certificates = Vec::new();
        for path in certificate.glob_matches()? {
            certificates.extend(load_certificate_file(&cert_property, &path)?);
        }
        if certificates.is_empty() {
            return Err(TlsError::Config(format!(
                "Property '{cert_property}' does not match any certificate files"
            )));
        }
        tracing::debug!(
            property = %cert_property,
            certificates = certificates.len(),
            leaf = %certificates[0].subject(),
            "Loaded certificates from directory glob"
        );

        let key = load_private_key(details)?;
        TrustMaterial::new(details.store_type.clone(), certificates, key).map(Some)
    }
}

/// Every certificate file matched by a glob must hold at least one certificate.
fn load_certificate_file(property: &str, path: &std::path::Path) -> TlsResult<Vec<Certificate>> {
    PemContent::load_path(path)?
        .certificates()
        .map_err(|e| TlsError::parse(format!("{property} ({})", path.display()), e))
}
