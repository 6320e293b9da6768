//! Transport behaviour against a mock HLB endpoint: rate-limit retries,
//! error envelopes, required headers.

mod common;

use std::time::{Duration, Instant};

use common::{test_config, Harness, HeaderRecorder, Sequence, API_KEY};
use hlb_client::transport::Transport;
use hlb_client::{ErrorKind, HlbError};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport(harness: &Harness, server: &MockServer) -> Transport {
    let config = test_config(server);
    Transport::new(&config, harness.cache(chrono::Duration::minutes(15))).unwrap()
}

#[tokio::test]
async fn test_rate_limited_requests_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/ping"))
        .respond_with(Sequence::new(vec![
            ResponseTemplate::new(429),
            ResponseTemplate::new(429),
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})),
        ]))
        .expect(3)
        .mount(&server)
        .await;

    let harness = Harness::new();
    let transport = transport(&harness, &server);
    let body: serde_json::Value = transport
        .get(&CancellationToken::new(), "/ping")
        .await
        .unwrap();

    assert_eq!(body["ok"], true);
    // One header serves every attempt while it stays valid.
    assert_eq!(harness.generator.calls(), 1);
}

#[tokio::test]
async fn test_retries_exhausted_returns_last_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/ping"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let harness = Harness::new();
    let err = transport(&harness, &server)
        .get::<serde_json::Value>(&CancellationToken::new(), "/ping")
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(429));
    assert_eq!(err.kind(), ErrorKind::Backend);
}

#[tokio::test]
async fn test_backend_envelope_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/things"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"code": 4001, "message": "subnets are required"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new();
    let err = transport(&harness, &server)
        .post::<_, serde_json::Value>(&CancellationToken::new(), "/things", &serde_json::json!({}))
        .await
        .unwrap_err();

    match &err {
        HlbError::Backend { status, code, message } => {
            assert_eq!(*status, 400);
            assert_eq!(*code, 4001);
            assert_eq!(message, "subnets are required");
        }
        other => panic!("expected backend error, got {:?}", other),
    }
    let envelope = err.api_response().unwrap();
    assert_eq!(envelope.code, 4001);
}

#[tokio::test]
async fn test_server_error_without_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/ping"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new();
    let err = transport(&harness, &server)
        .get::<serde_json::Value>(&CancellationToken::new(), "/ping")
        .await
        .unwrap_err();

    assert!(matches!(err, HlbError::Http { status: 500 }));
    assert!(err.api_response().is_none());
}

#[tokio::test]
async fn test_required_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/ping"))
        .and(header("x-api-key", API_KEY))
        .and(header("content-type", "application/json"))
        .and(header("x-sts-gci-headers", "signed-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new();
    transport(&harness, &server)
        .get::<serde_json::Value>(&CancellationToken::new(), "/ping")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_retry_after_is_clamped_to_max_wait() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/ping"))
        .respond_with(Sequence::new(vec![
            ResponseTemplate::new(429).insert_header("Retry-After", "30"),
            ResponseTemplate::new(200).set_body_json(serde_json::json!({})),
        ]))
        .expect(2)
        .mount(&server)
        .await;

    let harness = Harness::new();
    let started = Instant::now();
    transport(&harness, &server)
        .get::<serde_json::Value>(&CancellationToken::new(), "/ping")
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_header_refreshed_between_attempts() {
    let server = MockServer::start().await;
    let (recorder, seen) = HeaderRecorder::new(Sequence::new(vec![
        ResponseTemplate::new(429).insert_header("Retry-After", "1"),
        ResponseTemplate::new(200).set_body_json(serde_json::json!({})),
    ]));
    Mock::given(method("GET"))
        .and(path("/v1/ping"))
        .and(header_exists("x-sts-gci-headers"))
        .respond_with(recorder)
        .expect(2)
        .mount(&server)
        .await;

    let harness = Harness::new();
    let mut config = test_config(&server);
    config.retries.max_wait_ms = 1_200;
    let transport = Transport::new(&config, harness.cache(chrono::Duration::milliseconds(500))).unwrap();

    transport
        .get::<serde_json::Value>(&CancellationToken::new(), "/ping")
        .await
        .unwrap();

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen, vec!["signed-1".to_string(), "signed-2".to_string()]);
    assert_eq!(harness.generator.calls(), 2);
}

#[tokio::test]
async fn test_cancelled_before_send() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let harness = Harness::new();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = transport(&harness, &server)
        .get::<serde_json::Value>(&cancel, "/ping")
        .await
        .unwrap_err();

    assert!(matches!(err, HlbError::Cancelled));
}
