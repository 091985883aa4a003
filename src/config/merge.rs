//! Fill-absent merge of adapter configuration.
//!
//! # Responsibilities
//! - Fill every zero-valued field of an adapter's own properties from the
//!   common properties
//! - Never overwrite a configured value
//! - Merge header maps key by key, own keys first
//!
//! # Design Decisions
//! - Every `patch` destructures its struct without `..`, so a new field
//!   fails to compile until it gets a merge rule
//! - `patch` is idempotent: a second pass over the same common value is a no-op

use std::collections::BTreeMap;

use crate::config::schema::{
    AdapterLogging, AdapterProperties, Auth, HttpSettings, SslOptions, SslProperties,
    KeyProperties, StoreProperties,
};

/// Fill-absent composition with a fallback value.
pub trait Patch {
    fn patch(&mut self, common: &Self);
}

/// Merge `own` with `common`. A missing `common` returns `own` unchanged.
pub fn merge_if_absent(mut own: AdapterProperties, common: Option<&AdapterProperties>) -> AdapterProperties {
    if let Some(common) = common {
        own.patch(common);
    }
    own
}

impl Patch for AdapterProperties {
    fn patch(&mut self, common: &Self) {
        let AdapterProperties { url, headers, http, auth, logging, runtime } = self;

        fill_option(url, &common.url);
        fill_map(headers, &common.headers);
        http.patch(&common.http);
        auth.patch(&common.auth);
        logging.patch(&common.logging);
        fill_flag(runtime, common.runtime);
    }
}

impl Patch for HttpSettings {
    fn patch(&mut self, common: &Self) {
        let HttpSettings {
            request_timeout_ms,
            connect_timeout_ms,
            idle_connections_timeout_ms,
            max_connections,
            max_conn_per_route,
            pool_concurrency_policy,
            time_to_live_ms,
            skip_ssl,
            redirects_enable,
            ssl,
        } = self;

        fill_number(request_timeout_ms, common.request_timeout_ms);
        fill_number(connect_timeout_ms, common.connect_timeout_ms);
        fill_number(idle_connections_timeout_ms, common.idle_connections_timeout_ms);
        fill_number(max_connections, common.max_connections);
        fill_number(max_conn_per_route, common.max_conn_per_route);
        fill_option(pool_concurrency_policy, &common.pool_concurrency_policy);
        fill_number(time_to_live_ms, common.time_to_live_ms);
        fill_flag(skip_ssl, common.skip_ssl);
        fill_flag(redirects_enable, common.redirects_enable);

        match (ssl.as_mut(), common.ssl.as_ref()) {
            (Some(own), Some(common)) => own.patch(common),
            (None, Some(common)) => *ssl = Some(common.clone()),
            _ => {}
        }
    }
}

impl Patch for SslProperties {
    fn patch(&mut self, common: &Self) {
        let SslProperties { protocol, key, options, keystore, truststore } = self;

        fill_option(protocol, &common.protocol);
        key.patch(&common.key);
        options.patch(&common.options);
        keystore.patch(&common.keystore);
        truststore.patch(&common.truststore);
    }
}

impl Patch for KeyProperties {
    fn patch(&mut self, common: &Self) {
        let KeyProperties { alias, password } = self;
        fill_option(alias, &common.alias);
        fill_option(password, &common.password);
    }
}

impl Patch for SslOptions {
    fn patch(&mut self, common: &Self) {
        let SslOptions { ciphers, enabled_protocols } = self;
        fill_list(ciphers, &common.ciphers);
        fill_list(enabled_protocols, &common.enabled_protocols);
    }
}

impl Patch for StoreProperties {
    fn patch(&mut self, common: &Self) {
        let StoreProperties { store_type, certificate, private_key, private_key_password } = self;
        fill_option(store_type, &common.store_type);
        fill_option(certificate, &common.certificate);
        fill_option(private_key, &common.private_key);
        fill_option(private_key_password, &common.private_key_password);
    }
}

impl Patch for Auth {
    /// Auth variants are not mixed: an adapter either names its own scheme or
    /// inherits the common one whole.
    fn patch(&mut self, common: &Self) {
        if matches!(self, Auth::None) {
            *self = common.clone();
        }
    }
}

impl Patch for AdapterLogging {
    fn patch(&mut self, common: &Self) {
        let AdapterLogging { strategy, sensitive_fields, non_logging_fields } = self;
        if strategy.is_none() {
            *strategy = common.strategy;
        }
        fill_list(sensitive_fields, &common.sensitive_fields);
        fill_list(non_logging_fields, &common.non_logging_fields);
    }
}

fn fill_option(own: &mut Option<String>, common: &Option<String>) {
    if own.as_deref().map_or(true, str::is_empty) {
        if let Some(value) = common.as_ref().filter(|v| !v.is_empty()) {
            *own = Some(value.clone());
        }
    }
}

fn fill_number<N: Copy + Default + PartialEq>(own: &mut N, common: N) {
    if *own == N::default() {
        *own = common;
    }
}

fn fill_flag(own: &mut bool, common: bool) {
    *own |= common;
}

fn fill_list(own: &mut Vec<String>, common: &[String]) {
    if own.is_empty() {
        own.extend_from_slice(common);
    }
}

fn fill_map(own: &mut BTreeMap<String, String>, common: &BTreeMap<String, String>) {
    for (name, value) in common {
        own.entry(name.clone()).or_insert_with(|| value.clone());
    }
}
