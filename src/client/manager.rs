//! Hot-reload client manager.
//!
//! # Responsibilities
//! - Serve the active [`AdapterClient`] for an adapter key
//! - Rebuild it when a runtime-enabled adapter's configuration changes
//! - Keep serving the previous client when a rebuild fails
//!
//! # Design Decisions
//! - Rebuilds for one key are serialized by a per-key lock; other keys are
//!   never blocked
//! - The fingerprint of the configuration a client was built from lives on the
//!   client, so a waiter that acquires the lock after someone else finished the
//!   same rebuild returns the fresh client instead of building twice
//! - The configuration is fetched again once the lock is held, so a caller
//!   holding an older snapshot never replaces a client built from a newer one
//! - A failed rebuild is not retried until the configuration changes again
//! - The bearer token provider is carried over when only non-auth settings
//!   changed, keeping its cached token

use std::sync::Arc;

use crate::auth::{Clock, RequestAuth, SystemClock};
use crate::client::adapter::AdapterClient;
use crate::client::error::{AdapterError, AdapterResult};
use crate::client::registry::ClientRegistry;
use crate::client::transport::{ReqwestTransport, ReqwestTransportFactory, Transport, TransportFactory};
use crate::config::validation::validate_properties;
use crate::config::{ConfigError, ConfigSnapshot, ConfigSource};
use crate::observability::metrics;
use crate::tls::TlsBundleBuilder;

/// A rebuild step that failed, with its error.
#[derive(Debug)]
struct BuildFailure {
    step: &'static str,
    error: AdapterError,
}

impl BuildFailure {
    fn at(step: &'static str) -> impl FnOnce(AdapterError) -> Self {
        move |error| Self { step, error }
    }
}

pub struct ClientManager {
    source: Arc<dyn ConfigSource>,
    transports: Arc<dyn TransportFactory>,
    token_transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    tls: TlsBundleBuilder,
    registry: ClientRegistry,
}

impl ClientManager {
    /// Manager with reqwest transports and the system clock.
    pub fn new(source: Arc<dyn ConfigSource>) -> AdapterResult<Self> {
        let token_transport = Arc::new(ReqwestTransport::with_defaults()?);
        Ok(Self::with_parts(
            source,
            Arc::new(ReqwestTransportFactory),
            token_transport,
            Arc::new(SystemClock),
        ))
    }

    pub fn with_parts(
        source: Arc<dyn ConfigSource>,
        transports: Arc<dyn TransportFactory>,
        token_transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            transports,
            token_transport,
            clock,
            tls: TlsBundleBuilder::new(),
            registry: ClientRegistry::new(),
        }
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// The client currently served for `key`, without consulting the source.
    pub fn active_client(&self, key: &str) -> Option<Arc<AdapterClient>> {
        self.registry.active(key)
    }

    /// Client for `key`, building or rebuilding it as the configuration requires.
    ///
    /// Fails only when no client was ever built for `key` and one cannot be built now.
    pub async fn get_client(&self, key: &str) -> AdapterResult<Arc<AdapterClient>> {
        let active = self.registry.active(key);
        let snapshot = match self.source.fetch(key) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                return match active {
                    Some(client) => {
                        tracing::warn!(key = %key, error = %e, "Config fetch failed, serving current client");
                        Ok(client)
                    }
                    None => {
                        tracing::error!(key = %key, step = "fetch", error = %e, "Unable to create adapter client");
                        metrics::record_client_rebuild(key, "failure");
                        match e {
                            ConfigError::NotFound { key } => Err(AdapterError::ClientUnavailable { key }),
                            e => Err(e.into()),
                        }
                    }
                };
            }
        };

        match active {
            Some(client) if !(snapshot.properties.runtime && snapshot.refresh) => Ok(client),
            _ => self.rebuild(snapshot).await,
        }
    }

    async fn rebuild(&self, snapshot: ConfigSnapshot) -> AdapterResult<Arc<AdapterClient>> {
        let key = snapshot.key.clone();
        let lock = self.registry.lock_for(&key);

        let result = {
            let _guard = lock.lock().await;
            // the snapshot may have been overtaken while waiting for the lock
            let snapshot = self.source.fetch(&key).unwrap_or(snapshot);
            let fingerprint = snapshot.fingerprint();
            let previous = self.registry.active(&key);
            match previous {
                Some(current) if current.fingerprint() == fingerprint => Ok(current),
                previous => self.replace(snapshot, fingerprint, previous),
            }
        };

        self.registry.release(&key, lock);
        result
    }

    fn replace(
        &self,
        snapshot: ConfigSnapshot,
        fingerprint: String,
        previous: Option<Arc<AdapterClient>>,
    ) -> AdapterResult<Arc<AdapterClient>> {
        let key = snapshot.key.clone();
        match self.build(snapshot, fingerprint, previous.as_deref()) {
            Ok(client) => {
                let client = Arc::new(client);
                self.registry.publish(client.clone());
                metrics::record_client_rebuild(&key, "success");
                tracing::info!(
                    key = %key,
                    fingerprint = %client.fingerprint(),
                    auth = client.auth().kind(),
                    first = previous.is_none(),
                    properties = ?client.properties(),
                    "Adapter client built"
                );
                Ok(client)
            }
            Err(BuildFailure { step, error }) => {
                metrics::record_client_rebuild(&key, "failure");
                match previous {
                    Some(current) => {
                        tracing::error!(
                            key = %key,
                            step,
                            error = %error,
                            "Unable to rebuild adapter client, keeping previous client"
                        );
                        Ok(current)
                    }
                    None => {
                        tracing::error!(key = %key, step, error = %error, "Unable to create adapter client");
                        Err(error)
                    }
                }
            }
        }
    }

    fn build(
        &self,
        snapshot: ConfigSnapshot,
        fingerprint: String,
        previous: Option<&AdapterClient>,
    ) -> Result<AdapterClient, BuildFailure> {
        let ConfigSnapshot { key, properties, .. } = snapshot;

        validate_properties(&properties)
            .map_err(|errors| AdapterError::Config(ConfigError::Validation(errors)))
            .map_err(BuildFailure::at("validate"))?;

        let bundle = self
            .tls
            .create(&properties.http)
            .map_err(AdapterError::from)
            .map_err(BuildFailure::at("tls"))?;

        let auth = match previous {
            Some(current) if current.properties().auth == properties.auth => current.auth().clone(),
            _ => RequestAuth::from_config(&key, &properties.auth, self.token_transport.clone(), self.clock.clone())
                .map_err(AdapterError::from)
                .map_err(BuildFailure::at("auth"))?,
        };

        let transport = self
            .transports
            .create(&properties.http, &bundle)
            .map_err(AdapterError::from)
            .map_err(BuildFailure::at("transport"))?;

        AdapterClient::new(key, fingerprint, properties, auth, transport).map_err(BuildFailure::at("client"))
    }
}

impl std::fmt::Debug for ClientManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientManager")
            .field("clients", &self.registry.keys())
            .field("clock", &self.clock)
            .finish()
    }
}
