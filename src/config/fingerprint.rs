//! Content fingerprints for adapter configuration.
//!
//! The canonical form is the JSON rendering of `(key, properties)`: struct
//! fields serialize in declaration order and maps are `BTreeMap`s, so the
//! string is identical across processes for equal values.

use sha2::{Digest, Sha256};

use crate::config::schema::AdapterProperties;

/// Hex SHA-256 of the canonical form of `properties` under `key`.
pub fn fingerprint(key: &str, properties: &AdapterProperties) -> String {
    let canonical = serde_json::to_string(&(key, properties))
        .unwrap_or_else(|_| format!("{key}:{properties:?}"));
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashSet};

    use crate::config::schema::*;

    fn base() -> AdapterProperties {
        AdapterProperties {
            url: Some("https://svc.example".into()),
            headers: BTreeMap::from([("X-A".into(), "1".into()), ("X-B".into(), "2".into())]),
            http: HttpSettings {
                request_timeout_ms: 30_000,
                ssl: Some(SslProperties::default()),
                ..Default::default()
            },
            auth: Auth::Bearer(BearerCredentials {
                url: Some("https://idp.example/token".into()),
                ttl_millis: 1_000,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_equal_values_have_equal_fingerprints() {
        let a = base();
        let mut b = AdapterProperties::default();
        // different insertion order, same content
        b.headers.insert("X-B".into(), "2".into());
        b.headers.insert("X-A".into(), "1".into());
        b.url = a.url.clone();
        b.http = a.http.clone();
        b.auth = a.auth.clone();

        assert_eq!(fingerprint("svc.v1", &a), fingerprint("svc.v1", &b));
        assert_eq!(fingerprint("svc.v1", &a).len(), 64);
    }

    #[test]
    fn test_key_is_part_of_identity() {
        assert_ne!(fingerprint("svc.v1", &base()), fingerprint("svc.v2", &base()));
    }

    #[test]
    fn test_single_field_mutations_all_differ() {
        let bearer = |f: fn(&mut BearerCredentials)| {
            let mut props = base();
            if let Auth::Bearer(ref mut b) = props.auth {
                f(b);
            }
            props
        };
        let ssl = |f: fn(&mut SslProperties)| {
            let mut props = base();
            if let Some(ref mut s) = props.http.ssl {
                f(s);
            }
            props
        };
        let with = |f: fn(&mut AdapterProperties)| {
            let mut props = base();
            f(&mut props);
            props
        };

        let variants = vec![
            base(),
            with(|p| p.url = Some("https://svc2.example".into())),
            with(|p| p.url = None),
            with(|p| { p.headers.insert("X-C".into(), "3".into()); }),
            with(|p| { p.headers.insert("X-A".into(), "9".into()); }),
            with(|p| p.http.request_timeout_ms = 29_999),
            with(|p| p.http.connect_timeout_ms = 1),
            with(|p| p.http.idle_connections_timeout_ms = 1),
            with(|p| p.http.max_connections = 1),
            with(|p| p.http.max_conn_per_route = 1),
            with(|p| p.http.pool_concurrency_policy = Some("LAX".into())),
            with(|p| p.http.time_to_live_ms = 1),
            with(|p| p.http.skip_ssl = true),
            with(|p| p.http.redirects_enable = true),
            with(|p| p.http.ssl = None),
            ssl(|s| s.protocol = Some("TLSv1.2".into())),
            ssl(|s| s.key.alias = Some("client".into())),
            ssl(|s| s.truststore.certificate = Some("/ca.pem".into())),
            ssl(|s| s.options.ciphers = vec!["X".into()]),
            bearer(|b| b.ttl_millis = 1_001),
            bearer(|b| b.scope = Some("read".into())),
            bearer(|b| b.client_id = Some("svc".into())),
            bearer(|b| b.client_secret = Some("secret".into())),
            bearer(|b| b.grant_type = Some("client_credentials".into())),
            bearer(|b| b.token_json_path = Some("$.token".into())),
            with(|p| p.auth = Auth::None),
            with(|p| p.logging.strategy = Some(LogStrategy::Off)),
            with(|p| p.logging.sensitive_fields = vec!["password".into()]),
            with(|p| p.runtime = true),
        ];

        let fingerprints: HashSet<String> =
            variants.iter().map(|p| fingerprint("svc.v1", p)).collect();
        assert_eq!(fingerprints.len(), variants.len());
    }
}
