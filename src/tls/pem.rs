//! PEM text parsing.
//!
//! # Responsibilities
//! - Detect inline PEM and dereference file locations to text
//! - Extract every X.509 certificate from `BEGIN ... CERTIFICATE` blocks,
//!   including blocks holding several concatenated DER certificates
//! - Decode PKCS#8, PKCS#1, SEC1 and password-encrypted PKCS#8 private keys
//!
//! # Design Decisions
//! - Certificate scanning is label tolerant (`TRUSTED CERTIFICATE`, `X509 CERTIFICATE`)
//! - No chain or validity checks; certificates are parsed only to be stored
//! - Text without a key block yields `None`, not an error

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use url::Url;

use crate::tls::error::{ParseError, TlsError, TlsResult};

fn certificate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)-+BEGIN\s+.*CERTIFICATE[^-]*-+(?:\s|\r|\n)+([a-z0-9+/=\r\n]+)-+END\s+.*CERTIFICATE[^-]*-+",
        )
        .unwrap_or_else(|e| unreachable!("certificate pattern: {e}"))
    })
}

fn encrypted_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)-+BEGIN\s+ENCRYPTED\s+PRIVATE\s+KEY-+(?:\s|\r|\n)+([a-z0-9+/=\r\n]+)-+END\s+ENCRYPTED\s+PRIVATE\s+KEY-+")
            .unwrap_or_else(|e| unreachable!("encrypted key pattern: {e}"))
    })
}

fn key_label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)-+BEGIN\s+([A-Z0-9 ]*PRIVATE\s+KEY)-+")
            .unwrap_or_else(|e| unreachable!("key label pattern: {e}"))
    })
}

fn header_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"-+BEGIN\s+[^-]*-+").unwrap_or_else(|e| unreachable!("header pattern: {e}"))
    })
}

fn footer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"-+END\s+[^-]*-+").unwrap_or_else(|e| unreachable!("footer pattern: {e}"))
    })
}

/// A parsed X.509 certificate with the fields stores and logs care about.
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    der: CertificateDer<'static>,
    subject: String,
    issuer: String,
    public_key: Vec<u8>,
}

impl Certificate {
    pub fn from_der(der: &[u8]) -> Result<Self, ParseError> {
        let (rest, cert) = x509_parser::parse_x509_certificate(der)
            .map_err(|e| ParseError::Der(e.to_string()))?;
        if !rest.is_empty() {
            return Err(ParseError::Der(format!("{} trailing bytes", rest.len())));
        }
        Ok(Self::from_parsed(der, &cert))
    }

    fn from_parsed(der: &[u8], cert: &x509_parser::certificate::X509Certificate<'_>) -> Self {
        Self {
            der: CertificateDer::from(der.to_vec()),
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            public_key: cert.public_key().raw.to_vec(),
        }
    }

    pub fn der(&self) -> &CertificateDer<'static> {
        &self.der
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// DER encoded SubjectPublicKeyInfo.
    pub fn public_key_info(&self) -> &[u8] {
        &self.public_key
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .finish()
    }
}

/// PEM text, either given inline or read from a location.
#[derive(Clone, PartialEq, Eq)]
pub struct PemContent {
    text: String,
}

impl PemContent {
    /// True when `text` carries both a BEGIN header and an END footer.
    pub fn is_present_in_text(text: &str) -> bool {
        header_pattern().is_match(text) && footer_pattern().is_match(text)
    }

    /// Wrap already loaded text.
    pub fn of(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Inline PEM is used as is; anything else is treated as a location.
    pub fn load(content: &str) -> TlsResult<Self> {
        if Self::is_present_in_text(content) {
            return Ok(Self::of(content));
        }
        Self::load_path(&resolve_location(content)?)
    }

    pub fn load_path(path: &Path) -> TlsResult<Self> {
        fs::read_to_string(path)
            .map(Self::of)
            .map_err(|e| TlsError::io(path, e))
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn certificates(&self) -> Result<Vec<Certificate>, ParseError> {
        parse_certificates(&self.text)
    }

    pub fn private_key(&self, password: Option<&str>) -> Result<Option<PrivateKeyDer<'static>>, ParseError> {
        parse_private_key(&self.text, password)
    }
}

impl fmt::Debug for PemContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PemContent({} bytes)", self.text.len())
    }
}

/// Turn a `file:` URL or a path into an absolute path.
pub(crate) fn resolve_location(location: &str) -> TlsResult<PathBuf> {
    let location = location.trim();
    if let Ok(url) = Url::parse(location) {
        // single letter schemes are windows drive letters
        if url.scheme().len() > 1 {
            if url.scheme() != "file" {
                return Err(TlsError::UnsupportedLocation(location.to_string()));
            }
            return url
                .to_file_path()
                .map_err(|_| TlsError::UnsupportedLocation(location.to_string()));
        }
    }

    let path = PathBuf::from(location);
    if path.is_absolute() {
        return Ok(path);
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(&path))
        .map_err(|e| TlsError::io(path, e))
}

/// Every certificate in `text`, in order of appearance.
pub fn parse_certificates(text: &str) -> Result<Vec<Certificate>, ParseError> {
    let mut certificates = Vec::new();
    for captures in certificate_pattern().captures_iter(text) {
        let Some(body) = captures.get(1) else { continue };
        let der = decode_base64(body.as_str())?;
        read_der_sequence(&der, &mut certificates)?;
    }

    if certificates.is_empty() {
        return Err(ParseError::NoCertificates);
    }
    Ok(certificates)
}

fn read_der_sequence(mut der: &[u8], out: &mut Vec<Certificate>) -> Result<(), ParseError> {
    while !der.is_empty() {
        let (rest, cert) = x509_parser::parse_x509_certificate(der)
            .map_err(|e| ParseError::Der(e.to_string()))?;
        let consumed = der.len() - rest.len();
        out.push(Certificate::from_parsed(&der[..consumed], &cert));
        der = rest;
    }
    Ok(())
}

/// The first private key in `text`, or `None` if there is no key block.
pub fn parse_private_key(text: &str, password: Option<&str>) -> Result<Option<PrivateKeyDer<'static>>, ParseError> {
    if let Some(captures) = encrypted_key_pattern().captures(text) {
        let password = password.filter(|p| !p.is_empty()).ok_or(ParseError::PasswordRequired)?;
        let body = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        return decrypt_pkcs8(&decode_base64(body)?, password).map(Some);
    }

    match rustls_pemfile::private_key(&mut text.as_bytes()) {
        Ok(Some(key)) => Ok(Some(key)),
        Ok(None) => match key_label_pattern().captures(text).and_then(|c| c.get(1)) {
            Some(label) => Err(ParseError::UnsupportedKey(label.as_str().to_string())),
            None => Ok(None),
        },
        Err(e) => Err(ParseError::UnsupportedKey(e.to_string())),
    }
}

fn decrypt_pkcs8(der: &[u8], password: &str) -> Result<PrivateKeyDer<'static>, ParseError> {
    let encrypted = pkcs8::EncryptedPrivateKeyInfo::try_from(der)
        .map_err(|e| ParseError::KeyDecryption(e.to_string()))?;
    let document = encrypted
        .decrypt(password)
        .map_err(|e| ParseError::KeyDecryption(e.to_string()))?;
    Ok(PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(document.as_bytes().to_vec())))
}

fn decode_base64(body: &str) -> Result<Vec<u8>, ParseError> {
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}
