//! Metrics collection.
//!
//! # Responsibilities
//! - Count token refreshes, cache hits and client rebuilds per adapter key
//! - Record request counts and latency per adapter key and status
//!
//! # Metrics
//! - `adapter_token_refresh_total` (counter): refreshes by key, outcome
//! - `adapter_token_cache_hits_total` (counter): tokens served from cache by key
//! - `adapter_client_rebuild_total` (counter): client builds by key, outcome
//! - `adapter_requests_total` (counter): requests by key, status
//! - `adapter_request_duration_seconds` (histogram): latency by key
//!
//! # Design Decisions
//! - Only the `metrics` facade is used; the embedding application installs a recorder
//! - Without a recorder every call is a no-op

use std::time::Instant;

pub fn record_token_refresh(key: &str, outcome: &'static str) {
    metrics::counter!(
        "adapter_token_refresh_total",
        "key" => key.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_token_cache_hit(key: &str) {
    metrics::counter!("adapter_token_cache_hits_total", "key" => key.to_string()).increment(1);
}

pub fn record_client_rebuild(key: &str, outcome: &'static str) {
    metrics::counter!(
        "adapter_client_rebuild_total",
        "key" => key.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_request(key: &str, status: u16, start: Instant) {
    metrics::counter!(
        "adapter_requests_total",
        "key" => key.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("adapter_request_duration_seconds", "key" => key.to_string())
        .record(start.elapsed().as_secs_f64());
}
