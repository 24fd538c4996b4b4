use std::sync::Arc;

use serde_json::json;
use tryit::models::{CurlBody, HeaderRecord, RequestPayload};
use tryit::network::{ProxyBody, ProxyRequestBody, SpecFetcher};
use tryit::{
    BuiltRequest, EngineConfig, ProxyHandler, ReqwestTransport, RequestExecutor, SpecSession,
    TryItErrorKind,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Nothing listens here, so connecting fails before any response
const UNREACHABLE: &str = "http://127.0.0.1:1/pets";
const ORIGIN: &str = "http://localhost:5173";

fn blocked_request() -> BuiltRequest {
    let mut headers = HeaderRecord::new();
    headers.insert("content-type".into(), "application/json".into());
    BuiltRequest {
        method: "POST".into(),
        url: UNREACHABLE.into(),
        headers,
        body: Some(RequestPayload::Text("{\"name\":\"Rex\"}".into())),
        curl_body: Some(CurlBody::Raw {
            value: "{\"name\":\"Rex\"}".into(),
        }),
    }
}

fn config(proxy_base_url: String) -> EngineConfig {
    EngineConfig {
        proxy_base_url,
        current_origin: Some(ORIGIN.to_string()),
        ..EngineConfig::default()
    }
}

#[tokio::test]
async fn test_executor_falls_back_to_proxy_route() {
    let proxy = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/http/proxy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "method": "POST",
            "url": UNREACHABLE,
            "status": 201,
            "statusText": "Created",
            "durationMs": 8,
            "headers": {"content-type": "application/json"},
            "bodyText": "{\"id\":1}",
            "contentType": "application/json"
        })))
        .mount(&proxy)
        .await;

    let executor = RequestExecutor::new(Arc::new(ReqwestTransport::new()), config(proxy.uri()));
    let result = executor.execute(&blocked_request(), Some(3_000)).await.unwrap();
    assert_eq!(result.status, 201);
    assert_eq!(result.body_text, "{\"id\":1}");

    let requests = proxy.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let descriptor: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(descriptor["method"], "POST");
    assert_eq!(descriptor["url"], UNREACHABLE);
    assert_eq!(descriptor["headers"]["content-type"], "application/json");
    assert_eq!(descriptor["body"]["kind"], "raw");
}

#[tokio::test]
async fn test_proxy_rejection_surfaces_as_cors() {
    let proxy = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/http/proxy"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "URL is too long."})),
        )
        .mount(&proxy)
        .await;

    let executor = RequestExecutor::new(Arc::new(ReqwestTransport::new()), config(proxy.uri()));
    let err = executor.execute(&blocked_request(), None).await.unwrap_err();
    assert_eq!(err.kind, TryItErrorKind::Cors);
    assert!(err.details.unwrap().ends_with("proxy retry failed: URL is too long."));
}

#[tokio::test]
async fn test_proxy_handler_replays_upstream() {
    let upstream = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/notes/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .set_body_string("saved"),
        )
        .mount(&upstream)
        .await;

    let mut headers = HeaderRecord::new();
    headers.insert("Host".into(), "spoofed.example.com".into());
    headers.insert("X-Note".into(), "n1".into());

    let handler = ProxyHandler::new(Arc::new(ReqwestTransport::new()));
    let result = handler
        .handle(ProxyRequestBody {
            method: Some("put".into()),
            url: Some(format!("{}/notes/1", upstream.uri())),
            headers,
            timeout_ms: Some(5_000.0),
            body: ProxyBody::Raw {
                value: "hello".into(),
            },
        })
        .await
        .unwrap();

    assert_eq!(result.method, "PUT");
    assert_eq!(result.status, 200);
    assert_eq!(result.body_text, "saved");
    assert_eq!(result.content_type.as_deref(), Some("text/plain"));

    let requests = upstream.received_requests().await.unwrap();
    let received = &requests[0];
    assert_eq!(received.body, b"hello");
    assert!(received.headers.get("x-note").is_some());
    let host = received
        .headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert_ne!(host, "spoofed.example.com");
}

#[tokio::test]
async fn test_spec_fetcher_against_upstream() {
    let upstream = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/openapi.yaml"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("openapi: 3.0.0", "application/yaml"),
        )
        .mount(&upstream)
        .await;

    let fetcher = SpecFetcher::new(Arc::new(ReqwestTransport::new()), 15_000);

    let url = format!("{}/openapi.yaml", upstream.uri());
    let fetched = fetcher.fetch(Some(&url)).await.unwrap();
    assert_eq!(fetched.content, "openapi: 3.0.0");
    assert_eq!(fetched.content_type.as_deref(), Some("application/yaml"));

    let missing = format!("{}/missing.yaml", upstream.uri());
    let err = fetcher.fetch(Some(&missing)).await.unwrap_err();
    assert_eq!(err.status, 502);
    assert_eq!(err.error, "Upstream responded with HTTP 404 Not Found.");
}

#[tokio::test]
async fn test_session_loads_spec_over_http() {
    let upstream = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/specs/pets.yaml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "openapi: 3.0.0\n\
             info: {title: Pets, version: '1'}\n\
             paths:\n  /pets:\n    get:\n      operationId: listPets\n      tags: [pets]\n",
        ))
        .mount(&upstream)
        .await;

    let mut session = SpecSession::new(Arc::new(ReqwestTransport::new()), EngineConfig::default());
    session
        .load_from_url(&format!("{}/specs/pets.yaml", upstream.uri()))
        .await
        .unwrap();

    let state = session.state();
    assert_eq!(state.metadata.as_ref().unwrap().title, "Pets");
    assert_eq!(state.selected_endpoint_id.as_deref(), Some("listPets"));
    assert_eq!(state.endpoint_groups[0].tag, "pets");
}
