//! Configuration schema definitions.
//!
//! This module defines the per-adapter configuration structure.
//! All types derive Serde traits for deserialization from config files.
//! Zero values (empty strings, empty maps, `0`, `false`, `None`) mean
//! "not configured" and are filled from the common adapter entry on merge.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Key of the adapter entry every other adapter falls back to.
pub const COMMON_CONFIG_KEY: &str = "config.adapter.common.v1";

/// Mask used whenever a secret is rendered for logs.
pub const MASK: &str = "**masked**";

/// Configuration of one outbound adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdapterProperties {
    /// Base URL requests are resolved against.
    pub url: Option<String>,

    /// Static headers added to every request unless the request already has them.
    pub headers: BTreeMap<String, String>,

    /// Timeouts, pooling and TLS settings.
    pub http: HttpSettings,

    /// Authorization scheme. Missing means [`Auth::None`].
    pub auth: Auth,

    /// Request/response logging settings.
    pub logging: AdapterLogging,

    /// Whether configuration changes are applied without a restart.
    pub runtime: bool,
}

/// Transport-level settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpSettings {
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub idle_connections_timeout_ms: u64,
    pub max_connections: u32,
    pub max_conn_per_route: u32,
    /// Pool locking policy name (`LAX` / `STRICT`); informational for the reqwest pool.
    pub pool_concurrency_policy: Option<String>,
    pub time_to_live_ms: u64,
    /// Disables peer verification. Never on unless configured.
    pub skip_ssl: bool,
    pub redirects_enable: bool,
    pub ssl: Option<SslProperties>,
}

/// PEM based TLS material for the client side of the connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SslProperties {
    /// SSL protocol name; `TLS` when unset.
    pub protocol: Option<String>,
    pub key: KeyProperties,
    pub options: SslOptions,
    pub keystore: StoreProperties,
    pub truststore: StoreProperties,
}

impl SslProperties {
    pub fn protocol(&self) -> &str {
        self.protocol.as_deref().filter(|p| !p.trim().is_empty()).unwrap_or("TLS")
    }
}

/// Alias and password the key entry is registered with.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct KeyProperties {
    pub alias: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for KeyProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyProperties")
            .field("alias", &self.alias)
            .field("password", &self.password.as_ref().map(|_| MASK))
            .finish()
    }
}

/// Cipher and protocol allow-lists. Empty means platform default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SslOptions {
    pub ciphers: Vec<String>,
    pub enabled_protocols: Vec<String>,
}

/// One PEM store. Every value is inline PEM, a `file:` URL or a path.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreProperties {
    #[serde(rename = "type")]
    pub store_type: Option<String>,
    pub certificate: Option<String>,
    pub private_key: Option<String>,
    pub private_key_password: Option<String>,
}

impl StoreProperties {
    /// A store with nothing configured is not built at all.
    pub fn is_empty(&self) -> bool {
        is_blank(&self.store_type) && is_blank(&self.certificate) && is_blank(&self.private_key)
    }
}

impl fmt::Debug for StoreProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreProperties")
            .field("store_type", &self.store_type)
            .field("certificate", &self.certificate.as_ref().map(|c| abbreviate(c)))
            .field("private_key", &self.private_key.as_ref().map(|_| MASK))
            .field("private_key_password", &self.private_key_password.as_ref().map(|_| MASK))
            .finish()
    }
}

/// Authorization scheme, tagged by `type` in configuration files.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Auth {
    #[default]
    None,
    Basic(BasicCredentials),
    Header(HeaderCredentials),
    Bearer(BearerCredentials),
}

impl Auth {
    pub fn kind(&self) -> &'static str {
        match self {
            Auth::None => "NONE",
            Auth::Basic(_) => "BASIC",
            Auth::Header(_) => "HEADER",
            Auth::Bearer(_) => "BEARER",
        }
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::None => f.write_str("None"),
            Auth::Basic(c) => f.debug_tuple("Basic").field(c).finish(),
            Auth::Header(c) => f.debug_tuple("Header").field(c).finish(),
            Auth::Bearer(c) => f.debug_tuple("Bearer").field(c).finish(),
        }
    }
}

#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &MASK)
            .finish()
    }
}

#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderCredentials {
    pub headers: BTreeMap<String, String>,
}

impl fmt::Debug for HeaderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.headers.keys().map(|k| (k, MASK)))
            .finish()
    }
}

/// Client credentials exchanged for a short-lived bearer token.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BearerCredentials {
    /// Token endpoint.
    pub url: Option<String>,
    pub scope: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub grant_type: Option<String>,
    /// Token lifetime counted from the end of the refresh call.
    #[serde(alias = "ttl")]
    pub ttl_millis: u64,
    /// Token request content type; form encoding when unset.
    pub content_type: Option<String>,
    pub accept: Option<String>,
    /// Where the token sits in the JSON response, e.g. `$.access_token`.
    #[serde(alias = "token_path")]
    pub token_json_path: Option<String>,
}

impl fmt::Debug for BearerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerCredentials")
            .field("url", &self.url)
            .field("scope", &self.scope)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| MASK))
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| MASK))
            .field("grant_type", &self.grant_type)
            .field("ttl_millis", &self.ttl_millis)
            .field("content_type", &self.content_type)
            .field("accept", &self.accept)
            .field("token_json_path", &self.token_json_path)
            .finish()
    }
}

/// How much of each exchange is logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogStrategy {
    /// Uri, headers and bodies of both request and response.
    All,
    /// Uri, status and bodies.
    #[default]
    ReqRes,
    /// Everything, but only for failed exchanges.
    Failure,
    Off,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdapterLogging {
    /// `REQ_RES` when unset.
    pub strategy: Option<LogStrategy>,
    /// Header names and JSON fields whose values are masked.
    pub sensitive_fields: Vec<String>,
    /// JSON fields dropped from logged bodies.
    pub non_logging_fields: Vec<String>,
}

impl AdapterLogging {
    pub fn strategy(&self) -> LogStrategy {
        self.strategy.unwrap_or_default()
    }
}

pub(crate) fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn abbreviate(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if text.lines().nth(1).is_some() {
        format!("{line}...")
    } else {
        line.to_string()
    }
}
