//! Bearer token caching through a real reqwest transport.

mod common;

use std::sync::Arc;

use integration_adapter::auth::ManualClock;
use integration_adapter::client::{
    AdapterError, AdapterRequest, ClientManager, ReqwestTransport, ReqwestTransportFactory,
};
use integration_adapter::config::{ConfigDocument, MergingConfigSource};

use common::{adapters_toml, start_mock_backend, start_programmable_backend, MockBackend};

async fn setup(token_server: &MockBackend, api: &MockBackend, clock: Arc<ManualClock>) -> ClientManager {
    let body = format!(
        "url = \"{}\"\nruntime = true\nhttp = {{ skip_ssl = true }}\n\
         auth = {{ type = \"BEARER\", url = \"{}\", client_id = \"svc\", client_secret = \"s3cr3t\", \
         grant_type = \"client_credentials\", ttl_millis = 1000, token_json_path = \"$.access_token\" }}",
        api.url("/api"),
        token_server.url("/oauth/token"),
    );
    let document = ConfigDocument::parse(&adapters_toml(&[("svc.v1", &body)])).unwrap();
    let source = Arc::new(MergingConfigSource::new(document));
    ClientManager::with_parts(
        source,
        Arc::new(ReqwestTransportFactory),
        Arc::new(ReqwestTransport::with_defaults().unwrap()),
        clock,
    )
}

#[tokio::test]
async fn test_token_is_cached_until_expiry() {
    let token_server = start_programmable_backend(|call| async move {
        (200, format!("{{\"access_token\":\"tok-{}\",\"expires_in\":1}}", call + 1))
    })
    .await;
    let api = start_mock_backend("{\"ok\":true}").await;
    let clock = Arc::new(ManualClock::new(0));
    let manager = setup(&token_server, &api, clock.clone()).await;

    let client = manager.get_client("svc.v1").await.unwrap();
    client.send(AdapterRequest::get("/items")).await.unwrap();
    assert_eq!(token_server.calls(), 1);

    clock.set(500);
    let client = manager.get_client("svc.v1").await.unwrap();
    client.send(AdapterRequest::get("/items")).await.unwrap();
    assert_eq!(token_server.calls(), 1);

    clock.set(1500);
    let client = manager.get_client("svc.v1").await.unwrap();
    client.send(AdapterRequest::get("/items")).await.unwrap();
    assert_eq!(token_server.calls(), 2);

    let requests = api.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].starts_with("GET /api/items "));
    assert!(requests[1].to_ascii_lowercase().contains("authorization: bearer tok-1"));
    assert!(requests[2].to_ascii_lowercase().contains("authorization: bearer tok-2"));

    let token_request = &token_server.requests()[0];
    assert!(token_request.starts_with("POST /oauth/token "));
    assert!(token_request.ends_with("client_id=svc&client_secret=s3cr3t&grant_type=client_credentials"));
}

#[tokio::test]
async fn test_token_endpoint_failure_fails_the_request() {
    let token_server = start_programmable_backend(|_| async { (401, "{\"error\":\"invalid_client\"}".to_string()) }).await;
    let api = start_mock_backend("{}").await;
    let manager = setup(&token_server, &api, Arc::new(ManualClock::new(0))).await;

    let client = manager.get_client("svc.v1").await.unwrap();
    let err = client.send(AdapterRequest::get("/items")).await.unwrap_err();
    assert!(matches!(err, AdapterError::Auth(_)), "unexpected error {err:?}");
    assert_eq!(api.calls(), 0);

    // nothing cached, the next request tries again
    let _ = client.send(AdapterRequest::get("/items")).await;
    assert_eq!(token_server.calls(), 2);
}

#[tokio::test]
async fn test_invalid_token_response_is_authentication_error() {
    let token_server = start_mock_backend("{\"access_token\":\"stale\"}").await;
    let api = start_programmable_backend(|_| async { (403, "Invalid Token".to_string()) }).await;
    let manager = setup(&token_server, &api, Arc::new(ManualClock::new(0))).await;

    let client = manager.get_client("svc.v1").await.unwrap();
    let err = client.send(AdapterRequest::get("/items")).await.unwrap_err();
    assert!(matches!(err, AdapterError::Authentication { .. }), "unexpected error {err:?}");
}
