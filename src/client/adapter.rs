//! The client handed to request-sending code.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use http::StatusCode;
use url::Url;

use crate::auth::RequestAuth;
use crate::client::error::{AdapterError, AdapterResult};
use crate::client::interceptor::{
    AuthInterceptor, DefaultHeadersInterceptor, Interceptor, LoggingInterceptor, RequestIdInterceptor,
};
use crate::client::transport::Transport;
use crate::client::types::{AdapterRequest, AdapterResponse};
use crate::config::schema::AdapterProperties;
use crate::observability::metrics;

const INVALID_TOKEN: &str = "Invalid Token";

/// An immutable, fully built client for one configuration fingerprint.
///
/// Rebuilds create a new `AdapterClient`; requests already running on an
/// older one finish on it.
pub struct AdapterClient {
    key: String,
    fingerprint: String,
    base_url: Url,
    properties: Arc<AdapterProperties>,
    auth: RequestAuth,
    interceptors: Vec<Arc<dyn Interceptor>>,
    transport: Arc<dyn Transport>,
}

impl AdapterClient {
    pub fn new(
        key: impl Into<String>,
        fingerprint: impl Into<String>,
        properties: AdapterProperties,
        auth: RequestAuth,
        transport: Arc<dyn Transport>,
    ) -> AdapterResult<Self> {
        let key = key.into();
        let raw_url = properties
            .url
            .as_deref()
            .ok_or_else(|| AdapterError::InvalidRequest(format!("adapter '{key}' has no url")))?;
        let base_url = Url::parse(raw_url)
            .map_err(|e| AdapterError::InvalidRequest(format!("adapter '{key}' url '{raw_url}': {e}")))?;

        let interceptors: Vec<Arc<dyn Interceptor>> = vec![
            Arc::new(RequestIdInterceptor),
            Arc::new(DefaultHeadersInterceptor::new(&properties.headers)?),
            Arc::new(AuthInterceptor::new(auth.clone())),
            Arc::new(LoggingInterceptor::new(key.clone(), properties.logging.clone())),
        ];

        Ok(Self {
            key,
            fingerprint: fingerprint.into(),
            base_url,
            properties: Arc::new(properties),
            auth,
            interceptors,
            transport,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Fingerprint of the configuration this client was built from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn properties(&self) -> &AdapterProperties {
        &self.properties
    }

    pub fn auth(&self) -> &RequestAuth {
        &self.auth
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Send `request` through the interceptor chain and transport.
    ///
    /// Any status is returned as a response, except a 403 whose body starts with
    /// `Invalid Token`, which is reported as [`AdapterError::Authentication`].
    pub async fn send(&self, mut request: AdapterRequest) -> AdapterResult<AdapterResponse> {
        request.url = self.resolve(&request.url)?;
        for interceptor in &self.interceptors {
            interceptor.before_send(&mut request).await?;
        }

        let start = Instant::now();
        let response = match self.transport.send(request.clone()).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(key = %self.key, uri = %request.url, error = %e, "Adapter request failed");
                return Err(e.into());
            }
        };
        metrics::record_request(&self.key, response.status.as_u16(), start);

        for interceptor in &self.interceptors {
            interceptor.after_receive(&request, &response);
        }

        if response.status == StatusCode::FORBIDDEN && response.body.starts_with(INVALID_TOKEN.as_bytes()) {
            return Err(AdapterError::Authentication {
                url: request.url,
                message: response.text(),
            });
        }
        Ok(response)
    }

    fn resolve(&self, url: &str) -> AdapterResult<String> {
        if url.is_empty() {
            return Ok(self.base_url.to_string());
        }
        if Url::parse(url).is_ok() {
            return Ok(url.to_string());
        }
        // keep the base path: "https://h/api" + "/v1/x" → "https://h/api/v1/x"
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = url.trim_start_matches('/');
        let joined = format!("{base}/{path}");
        Url::parse(&joined)
            .map(String::from)
            .map_err(|e| AdapterError::InvalidRequest(format!("url '{url}': {e}")))
    }
}

impl fmt::Debug for AdapterClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterClient")
            .field("key", &self.key)
            .field("fingerprint", &self.fingerprint)
            .field("base_url", &self.base_url.as_str())
            .field("auth", &self.auth.kind())
            .finish()
    }
}
