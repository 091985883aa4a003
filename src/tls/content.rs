//! A single PEM bundle property and its directory-glob form.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::tls::error::{TlsError, TlsResult};
use crate::tls::pem::{resolve_location, PemContent};

/// Named property value: inline PEM, a location, or a location whose file
/// name is a glob (`certs/*.pem`).
#[derive(Debug, Clone, Copy)]
pub struct BundleContentProperty<'a> {
    name: &'a str,
    value: Option<&'a str>,
}

impl<'a> BundleContentProperty<'a> {
    pub fn new(name: &'a str, value: Option<&'a str>) -> Self {
        Self { name, value: value.filter(|v| !v.trim().is_empty()) }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn value(&self) -> Option<&'a str> {
        self.value
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_pem_content(&self) -> bool {
        self.value.is_some_and(PemContent::is_present_in_text)
    }

    /// A location whose final segment contains `*`.
    pub fn is_directory_glob(&self) -> bool {
        match self.value {
            Some(value) if !PemContent::is_present_in_text(value) => Path::new(value.trim())
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.contains('*')),
            _ => false,
        }
    }

    /// Regular files in the glob's directory matching its pattern, sorted by name.
    pub fn glob_matches(&self) -> TlsResult<Vec<PathBuf>> {
        let value = self.value.ok_or_else(|| TlsError::Config(format!("Property '{}' has no value", self.name)))?;
        let path = resolve_location(value)?;
        let (Some(dir), Some(pattern)) = (path.parent(), path.file_name().and_then(|n| n.to_str())) else {
            return Err(TlsError::Config(format!("Property '{}' is not a valid glob", self.name)));
        };
        let matcher = glob_regex(pattern)?;

        let mut matches = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| TlsError::io(dir, e))? {
            let entry = entry.map_err(|e| TlsError::io(dir, e))?;
            let file_type = entry.file_type().map_err(|e| TlsError::io(entry.path(), e))?;
            let matched = entry.file_name().to_str().is_some_and(|name| matcher.is_match(name));
            if file_type.is_file() && matched {
                matches.push(entry.path());
            }
        }
        matches.sort();
        Ok(matches)
    }

    /// Inline text or the content of the referenced file.
    pub fn load(&self) -> TlsResult<Option<PemContent>> {
        self.value.map(PemContent::load).transpose()
    }
}

/// `*` matches any run of characters, `?` a single one; everything else is literal.
fn glob_regex(pattern: &str) -> TlsResult<Regex> {
    let mut expr = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|e| TlsError::Config(format!("invalid glob '{pattern}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let inline = BundleContentProperty::new("certificate", Some("-----BEGIN CERTIFICATE-----\nAA\n-----END CERTIFICATE-----"));
        assert!(inline.is_pem_content());
        assert!(!inline.is_directory_glob());

        let glob = BundleContentProperty::new("certificate", Some("/etc/ca/*.pem"));
        assert!(glob.is_directory_glob());
        assert!(!glob.is_pem_content());

        let star_in_dir = BundleContentProperty::new("certificate", Some("/etc/*/ca.pem"));
        assert!(!star_in_dir.is_directory_glob());

        let blank = BundleContentProperty::new("certificate", Some("  "));
        assert!(!blank.has_value());
    }

    #[test]
    fn test_glob_regex() {
        let re = glob_regex("*.pem").unwrap();
        assert!(re.is_match("01.pem"));
        assert!(!re.is_match("01.pem.bak"));
        assert!(!re.is_match("01xpem"));
        assert!(glob_regex("ca-?.crt").unwrap().is_match("ca-1.crt"));
    }

    #[test]
    fn test_glob_matches_sorted_regular_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["03.pem", "01.pem", "02.pem", "notes.txt"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        fs::create_dir(dir.path().join("00.pem")).unwrap();

        let pattern = dir.path().join("*.pem");
        let property = BundleContentProperty::new("certificate", pattern.to_str());
        let names: Vec<_> = property
            .glob_matches()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["01.pem", "02.pem", "03.pem"]);
    }
}
