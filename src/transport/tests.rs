//! Tests for transport module

use super::*;
use crate::error::Error;
use crate::types::{BackoffType, QueryParams};
use serde_json::json;
use std::io::Write;
use std::time::Duration;
use test_case::test_case;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn params(pairs: &[(&str, &str)]) -> QueryParams {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn transport_for(server: &MockServer) -> HttpTransport {
    let config = HttpTransportConfig::builder(format!("{}/w/api.php", server.uri()))
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(1),
            Duration::from_millis(5),
        )
        .no_rate_limit()
        .build();
    HttpTransport::new(config).unwrap()
}

// ============================================================================
// HTTP Transport Tests
// ============================================================================

#[tokio::test]
async fn test_http_request_sends_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("action", "query"))
        .and(query_param("titles", "Main Page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "batchcomplete": true,
            "query": {"pages": [{"pageid": 1, "title": "Main Page"}]}
        })))
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    let body = transport
        .request(&params(&[("action", "query"), ("titles", "Main Page")]))
        .await
        .unwrap();
    assert_eq!(body["query"]["pages"][0]["pageid"], 1);
}

#[tokio::test]
async fn test_http_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"batchcomplete": true})))
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    let body = transport.request(&QueryParams::new()).await.unwrap();
    assert_eq!(body["batchcomplete"], true);
}

#[tokio::test]
async fn test_http_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such endpoint"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    let err = transport.request(&QueryParams::new()).await.unwrap_err();
    match err {
        Error::HttpStatus { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "no such endpoint");
        }
        other => panic!("Expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_non_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    let err = transport.request(&QueryParams::new()).await.unwrap_err();
    assert!(matches!(err, Error::MalformedResponse { .. }));
}

#[test]
fn test_http_invalid_url() {
    let err = HttpTransport::new(HttpTransportConfig::builder("not a url").build()).unwrap_err();
    assert!(matches!(err, Error::InvalidUrl(_)));
}

#[test_case(BackoffType::Constant, &[100, 100, 100] ; "constant")]
#[test_case(BackoffType::Linear, &[100, 200, 300] ; "linear")]
#[test_case(BackoffType::Exponential, &[100, 200, 400, 500, 500] ; "exponential capped")]
fn test_retry_delays(backoff: BackoffType, expected_ms: &[u64]) {
    let policy = RetryPolicy {
        max_retries: 5,
        initial: Duration::from_millis(100),
        max: Duration::from_millis(500),
        backoff,
    };
    let delays: Vec<u64> = (0..expected_ms.len() as u32)
        .map(|attempt| policy.delay(attempt).as_millis() as u64)
        .collect();
    assert_eq!(delays, expected_ms);
}

#[test]
fn test_default_transport_is_throttled() {
    let transport =
        HttpTransport::new(HttpTransportConfig::builder("https://example.org/w/api.php").build())
            .unwrap();
    assert!(transport.is_throttled());
    assert_eq!(transport.retry_policy(), &RetryPolicy::default());
}

#[tokio::test]
async fn test_http_maxlag_is_sent_and_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("maxlag", "5"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Retry-After", "0")
                .set_body_json(json!({
                    "error": {"code": "maxlag", "info": "Waiting for db1: 7 seconds lagged"}
                })),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("maxlag", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"batchcomplete": true})))
        .expect(1)
        .mount(&server)
        .await;

    let config = HttpTransportConfig::builder(format!("{}/w/api.php", server.uri()))
        .no_rate_limit()
        .maxlag(5)
        .build();
    let body = HttpTransport::new(config)
        .unwrap()
        .request(&QueryParams::new())
        .await
        .unwrap();
    assert_eq!(body["batchcomplete"], true);
}

#[tokio::test]
async fn test_http_gives_up_after_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let config = HttpTransportConfig::builder(format!("{}/w/api.php", server.uri()))
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(1),
            Duration::from_millis(1),
        )
        .max_retries(2)
        .no_rate_limit()
        .build();
    let err = HttpTransport::new(config)
        .unwrap()
        .request(&QueryParams::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 502, .. }));
}

#[tokio::test]
async fn test_http_other_api_errors_pass_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"code": "badtitle", "info": "Bad title"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let body = transport_for(&server)
        .request(&QueryParams::new())
        .await
        .unwrap();
    assert_eq!(body["error"]["code"], "badtitle");
}

// ============================================================================
// Throttle Tests
// ============================================================================

#[tokio::test]
async fn test_throttle_allows_burst() {
    let throttle = Throttle::new(&RateLimit::new(1, 5));
    for _ in 0..5 {
        assert!(throttle.try_take());
    }
    assert!(!throttle.try_take());
}

#[tokio::test]
async fn test_throttle_zero_is_clamped() {
    let throttle = Throttle::new(&RateLimit::new(0, 0));
    throttle.wait().await;
}

#[test]
fn test_rate_limit_burst_defaults_to_one() {
    let limit: RateLimit = serde_json::from_value(json!({"per_second": 3})).unwrap();
    assert_eq!(limit, RateLimit::new(3, 1));
}

// ============================================================================
// Replay Transport Tests
// ============================================================================

#[tokio::test]
async fn test_replay_serves_in_order_then_exhausts() {
    let transport = ReplayTransport::new(vec![json!({"n": 1}), json!({"n": 2})]);
    assert_eq!(transport.remaining().await, 2);

    let first = transport.request(&QueryParams::new()).await.unwrap();
    let second = transport.request(&QueryParams::new()).await.unwrap();
    assert_eq!(first["n"], 1);
    assert_eq!(second["n"], 2);

    let err = transport.request(&QueryParams::new()).await.unwrap_err();
    assert!(matches!(err, Error::ProtocolExhaustion { .. }));
}

#[tokio::test]
async fn test_replay_from_jsonl_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"continue": {{"continue": "-||"}}}}"#).unwrap();
    writeln!(file).unwrap();
    writeln!(file, r#"{{"batchcomplete": true}}"#).unwrap();

    let transport = ReplayTransport::from_file(file.path()).unwrap();
    assert_eq!(transport.remaining().await, 2);
}

#[tokio::test]
async fn test_replay_from_array_and_errors() {
    let transport = ReplayTransport::from_str_content(r#"[{"a": 1}, {"b": 2}]"#).unwrap();
    assert_eq!(transport.remaining().await, 2);

    let err = ReplayTransport::from_str_content("{\"a\": 1}\nnot json\n").unwrap_err();
    assert!(err.to_string().contains("line 2"));

    let err = ReplayTransport::from_file("/nonexistent/recording.jsonl").unwrap_err();
    assert!(matches!(err, Error::FileNotFound { .. }));
}
