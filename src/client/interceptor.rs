//! Interceptor chain applied to every outbound request.
//!
//! # Responsibilities
//! - Tag requests with an `x-request-id`
//! - Add configured and default headers without overriding the caller's
//! - Inject authorization
//! - Log exchanges according to the adapter's log strategy

use async_trait::async_trait;
use http::header::{ACCEPT, ACCEPT_CHARSET, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::RequestAuth;
use crate::client::error::AdapterError;
use crate::client::types::{AdapterRequest, AdapterResponse};
use crate::config::schema::{AdapterLogging, LogStrategy, MASK};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Logged bodies are cut to this many characters.
const MAX_LOGGED_BODY: usize = 4096;

#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn before_send(&self, request: &mut AdapterRequest) -> Result<(), AdapterError>;

    fn after_receive(&self, _request: &AdapterRequest, _response: &AdapterResponse) {}
}

/// Adds a UUID v4 request id unless the caller set one.
#[derive(Debug, Default)]
pub struct RequestIdInterceptor;

#[async_trait]
impl Interceptor for RequestIdInterceptor {
    async fn before_send(&self, request: &mut AdapterRequest) -> Result<(), AdapterError> {
        if !request.headers.contains_key(X_REQUEST_ID) {
            let id = HeaderValue::from_str(&Uuid::new_v4().to_string())
                .map_err(|e| AdapterError::InvalidRequest(e.to_string()))?;
            request.headers.insert(X_REQUEST_ID, id);
        }
        Ok(())
    }
}

/// Put-if-absent of configured headers, then JSON defaults.
#[derive(Debug)]
pub struct DefaultHeadersInterceptor {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl DefaultHeadersInterceptor {
    pub fn new<'a, I>(configured: I) -> Result<Self, AdapterError>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut headers = Vec::new();
        for (name, value) in configured {
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| AdapterError::InvalidRequest(format!("header {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| AdapterError::InvalidRequest(format!("header {name}: {e}")))?;
            headers.push((header, value));
        }
        headers.push((CONTENT_TYPE, HeaderValue::from_static("application/json")));
        headers.push((ACCEPT, HeaderValue::from_static("application/json")));
        headers.push((ACCEPT_CHARSET, HeaderValue::from_static("UTF-8")));
        Ok(Self { headers })
    }
}

#[async_trait]
impl Interceptor for DefaultHeadersInterceptor {
    async fn before_send(&self, request: &mut AdapterRequest) -> Result<(), AdapterError> {
        for (name, value) in &self.headers {
            if !request.headers.contains_key(name) {
                request.headers.insert(name.clone(), value.clone());
            }
        }
        Ok(())
    }
}

/// Applies the client's [`RequestAuth`].
#[derive(Debug)]
pub struct AuthInterceptor {
    auth: RequestAuth,
}

impl AuthInterceptor {
    pub fn new(auth: RequestAuth) -> Self {
        Self { auth }
    }
}

#[async_trait]
impl Interceptor for AuthInterceptor {
    async fn before_send(&self, request: &mut AdapterRequest) -> Result<(), AdapterError> {
        Ok(self.auth.apply(&mut request.headers).await?)
    }
}

/// Logs finished exchanges per [`LogStrategy`].
#[derive(Debug)]
pub struct LoggingInterceptor {
    key: String,
    logging: AdapterLogging,
}

impl LoggingInterceptor {
    pub fn new(key: impl Into<String>, logging: AdapterLogging) -> Self {
        Self { key: key.into(), logging }
    }

    fn headers(&self, headers: &HeaderMap) -> String {
        headers
            .iter()
            .map(|(name, value)| {
                let shown = if value.is_sensitive() || self.is_sensitive(name.as_str()) {
                    MASK.to_string()
                } else {
                    String::from_utf8_lossy(value.as_bytes()).into_owned()
                };
                format!("{name}: {shown}")
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn body(&self, body: Option<&[u8]>) -> String {
        let Some(body) = body.filter(|b| !b.is_empty()) else {
            return String::new();
        };
        let text = match serde_json::from_slice::<Value>(body) {
            Ok(mut json) => {
                self.scrub(&mut json);
                json.to_string()
            }
            Err(_) => String::from_utf8_lossy(body).into_owned(),
        };
        text.chars().take(MAX_LOGGED_BODY).collect()
    }

    fn scrub(&self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                map.retain(|k, _| !self.logging.non_logging_fields.iter().any(|f| f.eq_ignore_ascii_case(k)));
                for (k, v) in map.iter_mut() {
                    if self.is_sensitive(k) {
                        *v = Value::String(MASK.to_string());
                    } else {
                        self.scrub(v);
                    }
                }
            }
            Value::Array(items) => items.iter_mut().for_each(|v| self.scrub(v)),
            _ => {}
        }
    }

    fn is_sensitive(&self, name: &str) -> bool {
        self.logging.sensitive_fields.iter().any(|f| f.eq_ignore_ascii_case(name))
    }
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn before_send(&self, _request: &mut AdapterRequest) -> Result<(), AdapterError> {
        Ok(())
    }

    fn after_receive(&self, request: &AdapterRequest, response: &AdapterResponse) {
        let strategy = self.logging.strategy();
        let failed = !response.is_success();
        match strategy {
            LogStrategy::Off => {}
            LogStrategy::Failure if !failed => {}
            LogStrategy::All | LogStrategy::Failure => tracing::info!(
                key = %self.key,
                method = %request.method,
                uri = %request.url,
                request_headers = %self.headers(&request.headers),
                request_body = %self.body(request.body.as_deref()),
                status = response.status.as_u16(),
                response_headers = %self.headers(&response.headers),
                response_body = %self.body(Some(&response.body)),
                elapsed_ms = response.elapsed.as_millis() as u64,
                "Adapter exchange"
            ),
            LogStrategy::ReqRes => tracing::info!(
                key = %self.key,
                method = %request.method,
                uri = %request.url,
                request_body = %self.body(request.body.as_deref()),
                status = response.status.as_u16(),
                response_body = %self.body(Some(&response.body)),
                elapsed_ms = response.elapsed.as_millis() as u64,
                "Adapter exchange"
            ),
        }
    }
}
