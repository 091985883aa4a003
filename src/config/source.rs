//! Configuration sources handing point-in-time snapshots to the client manager.
//!
//! # Responsibilities
//! - Resolve an adapter key to its merged properties
//! - Attach the `refresh` hint computed from the content fingerprint
//!
//! # Design Decisions
//! - Sources are synchronous; the manager calls them on every `get_client`
//! - The fingerprint is recomputed on every fetch and never stored in the snapshot

use crate::config::change::ChangeDetector;
use crate::config::error::{ConfigError, ConfigResult};
use crate::config::fingerprint::fingerprint;
use crate::config::loader::PropertyStore;
use crate::config::merge::merge_if_absent;
use crate::config::schema::{
    AdapterLogging, AdapterProperties, Auth, HttpSettings, LogStrategy, COMMON_CONFIG_KEY,
};

/// Configuration of one adapter at the moment it was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
    pub key: String,
    pub properties: AdapterProperties,
    /// True exactly on the first fetch after the content changed (or first load).
    pub refresh: bool,
}

impl ConfigSnapshot {
    pub fn new(key: impl Into<String>, properties: AdapterProperties, refresh: bool) -> Self {
        Self { key: key.into(), properties, refresh }
    }

    /// Content hash of key and properties. `refresh` is not part of it.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.key, &self.properties)
    }
}

/// Supplies configuration snapshots by adapter key.
pub trait ConfigSource: Send + Sync {
    fn fetch(&self, key: &str) -> ConfigResult<ConfigSnapshot>;
}

/// Merges each adapter entry with the common entry and flags changes.
#[derive(Debug)]
pub struct MergingConfigSource<S> {
    store: S,
    common_key: String,
    detector: ChangeDetector,
}

impl<S: PropertyStore> MergingConfigSource<S> {
    pub fn new(store: S) -> Self {
        Self::with_common_key(store, COMMON_CONFIG_KEY)
    }

    pub fn with_common_key(store: S, common_key: impl Into<String>) -> Self {
        Self {
            store,
            common_key: common_key.into(),
            detector: ChangeDetector::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    fn common(&self, key: &str) -> ConfigResult<Option<AdapterProperties>> {
        if key == self.common_key {
            return Ok(None);
        }
        let common = self.store.properties(&self.common_key)?;
        if common.is_none() {
            tracing::warn!(key = %key, common_key = %self.common_key, "Common adapter config is not found");
        }
        Ok(common)
    }
}

impl<S: PropertyStore> ConfigSource for MergingConfigSource<S> {
    fn fetch(&self, key: &str) -> ConfigResult<ConfigSnapshot> {
        let own = self
            .store
            .properties(key)?
            .ok_or_else(|| ConfigError::NotFound { key: key.to_string() })?;
        let common = self.common(key)?;
        let properties = merge_if_absent(own, common.as_ref());

        let status = self.detector.detect_change(key, &fingerprint(key, &properties));
        if status.is_changed {
            tracing::debug!(key = %key, first_load = status.is_first_load, "Adapter config changed");
        }

        Ok(ConfigSnapshot::new(key, properties, status.is_changed))
    }
}

/// The same defaults for every key, never refreshed after the first fetch.
#[derive(Debug, Clone)]
pub struct StaticConfigSource {
    url: String,
    detector: ChangeDetector,
}

impl StaticConfigSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), detector: ChangeDetector::new() }
    }

    pub fn default_properties(&self) -> AdapterProperties {
        AdapterProperties {
            url: Some(self.url.clone()),
            headers: Default::default(),
            http: HttpSettings {
                request_timeout_ms: 30_000,
                connect_timeout_ms: 10_000,
                idle_connections_timeout_ms: 60_000,
                max_connections: 10,
                skip_ssl: true,
                ..Default::default()
            },
            auth: Auth::None,
            logging: AdapterLogging {
                strategy: Some(LogStrategy::ReqRes),
                ..Default::default()
            },
            runtime: false,
        }
    }
}

impl ConfigSource for StaticConfigSource {
    fn fetch(&self, key: &str) -> ConfigResult<ConfigSnapshot> {
        let properties = self.default_properties();
        let status = self.detector.detect_change(key, &fingerprint(key, &properties));
        Ok(ConfigSnapshot::new(key, properties, status.is_changed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::ConfigDocument;

    const CONFIG: &str = r#"
        [adapters."config.adapter.common.v1"]
        url = "https://fallback.example"
        headers = { "X-Tenant" = "acme" }
        [adapters."config.adapter.common.v1".http]
        request_timeout_ms = 30000
        skip_ssl = true

        [adapters."svc.v1"]
        url = "https://svc.example"
        runtime = true

        [adapters."bare.v1"]
    "#;

    fn source() -> MergingConfigSource<ConfigDocument> {
        MergingConfigSource::new(ConfigDocument::parse(CONFIG).unwrap())
    }

    #[test]
    fn test_fetch_merges_common() {
        let snapshot = source().fetch("svc.v1").unwrap();
        assert_eq!(snapshot.properties.url.as_deref(), Some("https://svc.example"));
        assert_eq!(snapshot.properties.http.request_timeout_ms, 30_000);
        assert_eq!(snapshot.properties.headers.get("X-Tenant").map(String::as_str), Some("acme"));

        let bare = source().fetch("bare.v1").unwrap();
        assert_eq!(bare.properties.url.as_deref(), Some("https://fallback.example"));
    }

    #[test]
    fn test_refresh_only_on_change() {
        let source = source();
        assert!(source.fetch("svc.v1").unwrap().refresh);
        assert!(!source.fetch("svc.v1").unwrap().refresh);
        assert!(!source.fetch("svc.v1").unwrap().refresh);
        assert!(source.fetch("bare.v1").unwrap().refresh);
    }

    #[test]
    fn test_missing_key() {
        let err = source().fetch("nope.v1").unwrap_err();
        assert_eq!(err.to_string(), "Adapter config for key 'nope.v1' is not found");
    }

    #[test]
    fn test_missing_common_uses_own() {
        let doc = ConfigDocument::parse("[adapters.\"svc.v1\"]\nurl = \"https://svc.example\"\n").unwrap();
        let snapshot = MergingConfigSource::new(doc).fetch("svc.v1").unwrap();
        assert_eq!(snapshot.properties.http.request_timeout_ms, 0);
    }

    #[test]
    fn test_snapshot_fingerprint_ignores_refresh() {
        let a = ConfigSnapshot::new("svc.v1", AdapterProperties::default(), true);
        let b = ConfigSnapshot::new("svc.v1", AdapterProperties::default(), false);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_static_source_refreshes_once_per_key() {
        let source = StaticConfigSource::new("https://svc.example");
        let first = source.fetch("svc.v1").unwrap();
        assert!(first.refresh);
        assert_eq!(first.properties.http.connect_timeout_ms, 10_000);
        assert!(first.properties.http.skip_ssl);
        assert!(!source.fetch("svc.v1").unwrap().refresh);
    }
}
