//! Network transport abstraction and its reqwest implementation.
//!
//! # Responsibilities
//! - Execute one request and hand back the raw response
//! - Map [`HttpSettings`] and a [`TlsBundle`] onto a `reqwest::Client`
//!
//! # Design Decisions
//! - Transports are built per client build and never reconfigured in place
//! - Peer verification is only disabled for insecure (`skip_ssl`) bundles

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::client::error::TransportError;
use crate::client::types::{AdapterRequest, AdapterResponse};
use crate::config::schema::HttpSettings;
use crate::tls::TlsBundle;

/// The network client requests are delegated to.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: AdapterRequest) -> Result<AdapterResponse, TransportError>;
}

/// Creates a transport for a client build.
pub trait TransportFactory: Send + Sync {
    fn create(&self, http: &HttpSettings, tls: &TlsBundle) -> Result<Arc<dyn Transport>, TransportError>;
}

/// Transport backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Plain client for endpoints outside an adapter's settings (token endpoints).
    pub fn with_defaults() -> Result<Self, TransportError> {
        Ok(Self::new(reqwest::Client::builder().use_rustls_tls().build()?))
    }

    pub fn from_settings(http: &HttpSettings, tls: &TlsBundle) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder().use_rustls_tls();

        if let Some(timeout) = millis(http.request_timeout_ms) {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = millis(http.connect_timeout_ms) {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(idle) = millis(http.idle_connections_timeout_ms) {
            builder = builder.pool_idle_timeout(idle);
        }
        let per_host = match (http.max_conn_per_route, http.max_connections) {
            (0, 0) => None,
            (0, total) => Some(total),
            (route, _) => Some(route),
        };
        if let Some(per_host) = per_host {
            builder = builder.pool_max_idle_per_host(per_host as usize);
        }
        builder = builder.redirect(if http.redirects_enable {
            reqwest::redirect::Policy::default()
        } else {
            reqwest::redirect::Policy::none()
        });

        if tls.is_insecure() {
            builder = builder.danger_accept_invalid_certs(true);
        } else if let Some(config) = tls
            .client_config()
            .map_err(|e| TransportError::Build(e.to_string()))?
        {
            builder = builder.use_preconfigured_tls(config);
        }

        Ok(Self::new(builder.build()?))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: AdapterRequest) -> Result<AdapterResponse, TransportError> {
        let url = reqwest::Url::parse(&request.url)
            .map_err(|_| TransportError::InvalidUrl(request.url.clone()))?;
        let start = Instant::now();

        let mut outbound = self.client.request(request.method, url).headers(request.headers);
        if let Some(body) = request.body {
            outbound = outbound.body(body);
        }
        let response = outbound.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(AdapterResponse {
            status,
            headers,
            body,
            elapsed: start.elapsed(),
        })
    }
}

/// Builds a [`ReqwestTransport`] per client build.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestTransportFactory;

impl TransportFactory for ReqwestTransportFactory {
    fn create(&self, http: &HttpSettings, tls: &TlsBundle) -> Result<Arc<dyn Transport>, TransportError> {
        Ok(Arc::new(ReqwestTransport::from_settings(http, tls)?))
    }
}

fn millis(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_millis(value))
}
