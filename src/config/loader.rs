//! Configuration loading from disk.
//!
//! A configuration file holds one table per adapter key under `[adapters]`.
//! Entries stay as raw TOML until a key is fetched, so a malformed entry only
//! breaks its own key.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Deserialize;

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::schema::AdapterProperties;

/// Lookup of raw adapter properties by key.
pub trait PropertyStore: Send + Sync {
    /// `Ok(None)` when the key is not configured.
    fn properties(&self, key: &str) -> ConfigResult<Option<AdapterProperties>>;
}

impl<T: PropertyStore + ?Sized> PropertyStore for Arc<T> {
    fn properties(&self, key: &str) -> ConfigResult<Option<AdapterProperties>> {
        (**self).properties(key)
    }
}

/// A parsed configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigDocument {
    adapters: HashMap<String, toml::Value>,
}

impl ConfigDocument {
    pub fn parse(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Build a document from already typed entries.
    pub fn from_entries<I>(entries: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (String, AdapterProperties)>,
    {
        let mut adapters = HashMap::new();
        for (key, properties) in entries {
            adapters.insert(key, toml::Value::try_from(&properties)?);
        }
        Ok(Self { adapters })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }
}

impl PropertyStore for ConfigDocument {
    fn properties(&self, key: &str) -> ConfigResult<Option<AdapterProperties>> {
        match self.adapters.get(key) {
            None => Ok(None),
            Some(value) => value
                .clone()
                .try_into()
                .map(Some)
                .map_err(|source| ConfigError::Merge { key: key.to_string(), source }),
        }
    }
}

/// Load a configuration document from a TOML file.
pub fn load_document(path: &Path) -> ConfigResult<ConfigDocument> {
    let content = fs::read_to_string(path)?;
    ConfigDocument::parse(&content)
}

/// A configuration file that can be re-read while clients are using it.
#[derive(Debug)]
pub struct FileConfigStore {
    path: PathBuf,
    document: ArcSwap<ConfigDocument>,
}

impl FileConfigStore {
    pub fn open(path: &Path) -> ConfigResult<Self> {
        let document = load_document(path)?;
        tracing::info!(path = ?path, adapters = document.adapters.len(), "Configuration loaded");
        Ok(Self {
            path: path.to_path_buf(),
            document: ArcSwap::from_pointee(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file. On failure the previous document stays active.
    pub fn reload(&self) -> ConfigResult<()> {
        let document = load_document(&self.path)?;
        tracing::info!(path = ?self.path, adapters = document.adapters.len(), "Configuration reloaded");
        self.document.store(Arc::new(document));
        Ok(())
    }

    pub fn document(&self) -> Arc<ConfigDocument> {
        self.document.load_full()
    }
}

impl PropertyStore for FileConfigStore {
    fn properties(&self, key: &str) -> ConfigResult<Option<AdapterProperties>> {
        self.document.load().properties(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"
        [adapters."config.adapter.common.v1"]
        url = "https://fallback.example"
        [adapters."config.adapter.common.v1".http]
        request_timeout_ms = 30000
        skip_ssl = true

        [adapters."svc.v1"]
        url = "https://svc.example"
        runtime = true

        [adapters."broken.v1"]
        runtime = "yes"
    "#;

    #[test]
    fn test_parse_document() {
        let doc = ConfigDocument::parse(CONFIG).unwrap();
        let props = doc.properties("svc.v1").unwrap().unwrap();
        assert_eq!(props.url.as_deref(), Some("https://svc.example"));
        assert!(props.runtime);
        assert!(doc.properties("missing").unwrap().is_none());
        assert_eq!(doc.keys().count(), 3);
    }

    #[test]
    fn test_malformed_entry_only_breaks_its_key() {
        let doc = ConfigDocument::parse(CONFIG).unwrap();
        assert!(matches!(
            doc.properties("broken.v1"),
            Err(ConfigError::Merge { ref key, .. }) if key == "broken.v1"
        ));
        assert!(doc.properties("svc.v1").is_ok());
    }

    #[test]
    fn test_from_entries_round_trips() {
        let props = AdapterProperties {
            url: Some("https://svc.example".into()),
            ..Default::default()
        };
        let doc = ConfigDocument::from_entries([("svc.v1".to_string(), props.clone())]).unwrap();
        assert_eq!(doc.properties("svc.v1").unwrap(), Some(props));
    }

    #[test]
    fn test_file_store_reload_keeps_previous_on_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();
        let store = FileConfigStore::open(file.path()).unwrap();

        fs::write(file.path(), "adapters = [").unwrap();
        assert!(matches!(store.reload(), Err(ConfigError::Parse(_))));
        assert!(store.properties("svc.v1").unwrap().is_some());

        fs::write(file.path(), "[adapters.\"other.v1\"]\nurl = \"https://other.example\"\n").unwrap();
        store.reload().unwrap();
        assert!(store.properties("svc.v1").unwrap().is_none());
        assert!(store.properties("other.v1").unwrap().is_some());
    }
}
