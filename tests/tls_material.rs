//! PEM material generated with rcgen, loaded through the store factory.

use std::path::Path;

use rcgen::{CertificateParams, CertifiedKey, DistinguishedName, DnType, KeyPair};
use rustls::pki_types::PrivateKeyDer;

use integration_adapter::config::schema::{HttpSettings, KeyProperties, SslProperties, StoreProperties};
use integration_adapter::tls::{
    create_tls_bundle, parse_certificates, parse_private_key, DefaultPemStoreFactory, PemStoreFactory, StoreEntry,
    TlsError,
};

fn self_signed(common_name: &str) -> CertifiedKey {
    let mut params = CertificateParams::new(vec![common_name.to_string()]).unwrap();
    let mut name = DistinguishedName::new();
    name.push(DnType::CommonName, common_name);
    params.distinguished_name = name;
    let key_pair = KeyPair::generate().unwrap();
    let cert = params.self_signed(&key_pair).unwrap();
    CertifiedKey { cert, key_pair }
}

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_generated_certificate_and_key_round_trip() {
    let generated = self_signed("leaf.example");

    let certificates = parse_certificates(&generated.cert.pem()).unwrap();
    assert_eq!(certificates.len(), 1);
    let certificate = &certificates[0];
    assert_eq!(certificate.subject(), "CN=leaf.example");
    assert_eq!(certificate.issuer(), "CN=leaf.example");
    assert_eq!(certificate.der().as_ref(), generated.cert.der().as_ref());
    assert_eq!(certificate.public_key_info(), generated.key_pair.public_key_der().as_slice());

    let key = parse_private_key(&generated.key_pair.serialize_pem(), None).unwrap().unwrap();
    match key {
        PrivateKeyDer::Pkcs8(der) => assert_eq!(der.secret_pkcs8_der(), generated.key_pair.serialize_der().as_slice()),
        other => panic!("unexpected key format {other:?}"),
    }
}

#[test]
fn test_glob_loads_files_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    // written out of order on purpose
    for name in ["03", "01", "02"] {
        write(dir.path(), &format!("{name}.pem"), &self_signed(&format!("ca-{name}.example")).cert.pem());
    }
    write(dir.path(), "notes.txt", "not a certificate");

    let details = StoreProperties {
        certificate: Some(format!("{}/*.pem", dir.path().display())),
        ..Default::default()
    };
    let material = DefaultPemStoreFactory.get_store("truststore", &details).unwrap().unwrap();
    let subjects: Vec<&str> = material.certificates().iter().map(|c| c.subject()).collect();
    assert_eq!(subjects, ["CN=ca-01.example", "CN=ca-02.example", "CN=ca-03.example"]);
}

#[test]
fn test_glob_with_leaf_key_builds_one_chain_entry() {
    let dir = tempfile::tempdir().unwrap();
    let leaf = self_signed("client.example");
    write(dir.path(), "01-leaf.pem", &leaf.cert.pem());
    write(dir.path(), "02-ca.pem", &self_signed("issuer.example").cert.pem());
    let key_path = write(dir.path(), "client.key", &leaf.key_pair.serialize_pem());

    let http = HttpSettings {
        ssl: Some(SslProperties {
            key: KeyProperties { alias: Some("client".into()), password: None },
            keystore: StoreProperties {
                certificate: Some(format!("{}/*.pem", dir.path().display())),
                private_key: Some(key_path),
                ..Default::default()
            },
            truststore: StoreProperties {
                certificate: Some(self_signed("root.example").cert.pem()),
                ..Default::default()
            },
            ..Default::default()
        }),
        ..Default::default()
    };

    let bundle = create_tls_bundle(&http).unwrap();
    let key_store = bundle.key_store().unwrap();
    assert_eq!(key_store.entries().len(), 1);
    match &key_store.entries()[0] {
        StoreEntry::PrivateKey { alias, chain, .. } => {
            assert_eq!(alias, "client");
            assert_eq!(chain[0].subject(), "CN=client.example");
            assert_eq!(chain[1].subject(), "CN=issuer.example");
        }
        other => panic!("unexpected entry {other:?}"),
    }
    assert!(bundle.client_config().unwrap().is_some());
}

#[test]
fn test_glob_private_key_is_ambiguous() {
    let dir = tempfile::tempdir().unwrap();
    let details = StoreProperties {
        certificate: Some(self_signed("leaf.example").cert.pem()),
        private_key: Some(format!("{}/*.key", dir.path().display())),
        ..Default::default()
    };
    let err = DefaultPemStoreFactory.get_store("keystore", &details).unwrap_err();
    assert!(matches!(err, TlsError::AmbiguousGlob { ref property } if property == "keystore.private-key"));
}

#[test]
fn test_file_url_location() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "ca.pem", &self_signed("ca.example").cert.pem());
    let details = StoreProperties {
        certificate: Some(format!("file://{path}")),
        ..Default::default()
    };
    let material = DefaultPemStoreFactory.get_store("truststore", &details).unwrap().unwrap();
    assert_eq!(material.certificates()[0].subject(), "CN=ca.example");
}
