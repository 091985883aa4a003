//! Bearer token cache with expiry-aware refresh.
//!
//! # Responsibilities
//! - Serve the cached token while `now < expires_at`
//! - Refresh it from the token endpoint once it has expired
//! - Let exactly one of many concurrent callers perform a refresh
//!
//! # Design Decisions
//! - Reads are lock-free (`ArcSwapOption`); the refresh critical section is a
//!   per-provider async mutex, never shared with client rebuilds
//! - Tokens are replaced, never mutated in place
//! - No early-refresh margin: expiry is exact
//! - Failures are not retried here; the caller decides

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderValue, Method, StatusCode};
use tokio::sync::Mutex;

use crate::auth::clock::Clock;
use crate::auth::json_path::JsonPath;
use crate::auth::AuthError;
use crate::client::transport::Transport;
use crate::client::types::AdapterRequest;
use crate::config::schema::BearerCredentials;
use crate::observability::metrics;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_ACCEPT: &str = "application/json";
const DEFAULT_TOKEN_PATH: &str = "$.access_token";

/// A token and the moment it stops being served.
#[derive(Clone, PartialEq, Eq)]
pub struct ActiveToken {
    pub value: String,
    pub expires_at_epoch_millis: i64,
}

impl ActiveToken {
    pub fn is_valid_at(&self, now_millis: i64) -> bool {
        now_millis < self.expires_at_epoch_millis
    }
}

impl fmt::Debug for ActiveToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveToken")
            .field("value", &crate::config::schema::MASK)
            .field("expires_at_epoch_millis", &self.expires_at_epoch_millis)
            .finish()
    }
}

/// Owns the bearer token of one adapter.
pub struct BearerTokenProvider {
    name: String,
    credentials: BearerCredentials,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    current: ArcSwapOption<ActiveToken>,
    refresh_lock: Mutex<()>,
}

impl BearerTokenProvider {
    pub fn new(
        name: impl Into<String>,
        credentials: BearerCredentials,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name: name.into(),
            credentials,
            transport,
            clock,
            current: ArcSwapOption::empty(),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn credentials(&self) -> &BearerCredentials {
        &self.credentials
    }

    /// The cached token if it has not expired, otherwise a freshly fetched one.
    pub async fn get_token(&self) -> Result<ActiveToken, AuthError> {
        if let Some(token) = self.valid_token() {
            metrics::record_token_cache_hit(&self.name);
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;
        // another caller may have refreshed while we waited
        if let Some(token) = self.valid_token() {
            return Ok(token);
        }

        match self.refresh().await {
            Ok(token) => {
                metrics::record_token_refresh(&self.name, "success");
                tracing::debug!(
                    key = %self.name,
                    expires_at = token.expires_at_epoch_millis,
                    "Bearer token refreshed"
                );
                self.current.store(Some(Arc::new(token.clone())));
                Ok(token)
            }
            Err(e) => {
                metrics::record_token_refresh(&self.name, "failure");
                tracing::warn!(key = %self.name, error = %e, "Bearer token refresh failed");
                Err(e)
            }
        }
    }

    fn valid_token(&self) -> Option<ActiveToken> {
        let now = self.clock.now_millis();
        self.current
            .load()
            .as_deref()
            .filter(|token| token.is_valid_at(now))
            .cloned()
    }

    async fn refresh(&self) -> Result<ActiveToken, AuthError> {
        let url = self
            .credentials
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| AuthError::Config("bearer token url is required".into()))?;
        let path = JsonPath::parse(
            self.credentials
                .token_json_path
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(DEFAULT_TOKEN_PATH),
        )
        .map_err(AuthError::Config)?;

        let request = self.token_request(url)?;
        let response = self.transport.send(request).await?;

        if response.status != StatusCode::OK {
            return Err(AuthError::Refresh(format!(
                "token endpoint answered {}",
                response.status
            )));
        }
        if response.body.is_empty() {
            return Err(AuthError::Refresh("token response body is empty".into()));
        }

        let body: serde_json::Value = serde_json::from_slice(&response.body)
            .map_err(|e| AuthError::Refresh(format!("token response is not JSON: {e}")))?;
        let value = path
            .select(&body)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AuthError::Refresh("Bearer token is null or empty".into()))?;

        Ok(ActiveToken {
            value: value.to_string(),
            expires_at_epoch_millis: self
                .clock
                .now_millis()
                .saturating_add(i64::try_from(self.credentials.ttl_millis).unwrap_or(i64::MAX)),
        })
    }

    fn token_request(&self, url: &str) -> Result<AdapterRequest, AuthError> {
        let content_type = self
            .credentials
            .content_type
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(FORM_CONTENT_TYPE);
        let accept = self
            .credentials
            .accept
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(JSON_ACCEPT);

        let fields = self.form_fields();
        let body = if content_type.to_ascii_lowercase().contains("json") {
            let object: serde_json::Map<String, serde_json::Value> = fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
                .collect();
            Bytes::from(serde_json::Value::Object(object).to_string())
        } else {
            let mut form = url::form_urlencoded::Serializer::new(String::new());
            for (name, value) in fields {
                form.append_pair(name, value);
            }
            Bytes::from(form.finish())
        };

        let mut request = AdapterRequest::new(Method::POST, url).with_body(body);
        request.headers.insert(CONTENT_TYPE, header_value(content_type)?);
        request.headers.insert(ACCEPT, header_value(accept)?);
        Ok(request)
    }

    /// Non-blank credential fields in request order.
    fn form_fields(&self) -> Vec<(&'static str, &str)> {
        let c = &self.credentials;
        [
            ("username", &c.username),
            ("password", &c.password),
            ("client_id", &c.client_id),
            ("client_secret", &c.client_secret),
            ("grant_type", &c.grant_type),
            ("scope", &c.scope),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(|v| (name, v))
        })
        .collect()
    }
}

impl fmt::Debug for BearerTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerTokenProvider")
            .field("name", &self.name)
            .field("credentials", &self.credentials)
            .finish()
    }
}

fn header_value(value: &str) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(value).map_err(|e| AuthError::InvalidHeader(e.to_string()))
}
