//! Request and response values passed through the interceptor chain and transport.

use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::error::AdapterError;

/// An outbound request. `url` may be relative to the adapter's base url.
#[derive(Debug, Clone)]
pub struct AdapterRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl AdapterRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// JSON body with a matching content type.
    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self, AdapterError> {
        let body = serde_json::to_vec(value)?;
        self.headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(body));
        Ok(self)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, AdapterError> {
        let invalid = |e: &dyn std::fmt::Display| AdapterError::InvalidRequest(format!("header {name}: {e}"));
        let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(&e))?;
        let value = HeaderValue::from_str(value).map_err(|e| invalid(&e))?;
        self.headers.insert(header, value);
        Ok(self)
    }
}

/// A response as received, whatever its status.
#[derive(Debug, Clone)]
pub struct AdapterResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub elapsed: Duration,
}

impl AdapterResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AdapterError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}
