//! Gateway integration tests: gateway → ToolClient → tool server, both on real sockets.

use axum::http::StatusCode as AxumStatus;
use axum::routing::get;
use axum::Router;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use weather_mcp::auth::mint_token;
use weather_mcp::client::{CallContext, GatewayServer, RetryPolicy, ToolClient};
use weather_mcp::server::{AppState, HttpServer};
use weather_mcp::types::CorrelationId;
use weather_mcp::Config;

const SECRET: &str = "gateway-secret-gateway-secret-gateway";

fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.jwt_secret = SECRET.to_string();
    config
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(5),
        max_backoff: Duration::from_millis(20),
        multiplier: 2.0,
    }
}

/// Helper: tool server on a random port.
async fn start_tool_server(config: &Config) -> SocketAddr {
    let state = AppState::from_config(config).unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(state, addr, config.server.max_body_bytes);
    tokio::spawn(async move {
        let _ = server.serve_listener(listener).await;
    });
    addr
}

/// Helper: gateway on a random port in front of `upstream`.
async fn start_gateway(upstream: &str, token: Option<String>) -> String {
    let client = ToolClient::new(upstream, Duration::from_secs(5), fast_retry())
        .unwrap()
        .with_token(token);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let gateway = GatewayServer::new(client, addr);
    tokio::spawn(async move {
        let _ = gateway.serve_listener(listener).await;
    });
    format!("http://{}", addr)
}

fn service_token(config: &Config) -> String {
    mint_token(
        &config.auth,
        "gateway",
        &["mcp.tools".to_string()],
        Duration::from_secs(600),
    )
    .unwrap()
}

async fn get_json(url: &str) -> (StatusCode, Value) {
    let response = reqwest::get(url).await.unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_forecast_through_gateway() {
    let config = test_config();
    let upstream = start_tool_server(&config).await;
    let gateway = start_gateway(&format!("http://{}", upstream), Some(service_token(&config))).await;

    let (status, body) = get_json(&format!("{}/weather/ca/forecast?days=3", gateway)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "CA");
    assert_eq!(body["forecast"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_current_and_alerts_through_gateway() {
    let config = test_config();
    let upstream = start_tool_server(&config).await;
    let gateway = start_gateway(&format!("http://{}", upstream), Some(service_token(&config))).await;

    let (status, body) = get_json(&format!("{}/weather/WA/current?city=Seattle", gateway)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["city"], "Seattle");

    let (status, body) = get_json(&format!("{}/weather/FL/alerts?severity=severe", gateway)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["alerts"].is_array());
}

#[tokio::test]
async fn test_upstream_validation_error_relayed() {
    let config = test_config();
    let upstream = start_tool_server(&config).await;
    let gateway = start_gateway(&format!("http://{}", upstream), Some(service_token(&config))).await;

    let (status, body) = get_json(&format!("{}/weather/TX/forecast?days=10", gateway)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "upstream");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("days must be between 1 and 7"));
}

#[tokio::test]
async fn test_malformed_query_is_structured_400() {
    let config = test_config();
    let upstream = start_tool_server(&config).await;
    let gateway = start_gateway(&format!("http://{}", upstream), Some(service_token(&config))).await;

    let (status, body) = get_json(&format!("{}/weather/TX/forecast?days=abc", gateway)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_request");
}

#[tokio::test]
async fn test_inbound_authorization_forwarded() {
    let config = test_config();
    let upstream = start_tool_server(&config).await;
    // No configured token: the caller's header is the only credential.
    let gateway = start_gateway(&format!("http://{}", upstream), None).await;

    let anonymous = reqwest::get(format!("{}/tools", gateway)).await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let response = reqwest::Client::new()
        .get(format!("{}/tools", gateway))
        .bearer_auth(service_token(&config))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["count"], 4);
}

#[tokio::test]
async fn test_gateway_health() {
    let config = test_config();
    let upstream = start_tool_server(&config).await;
    let healthy = start_gateway(&format!("http://{}", upstream), Some(service_token(&config))).await;
    let (status, body) = get_json(&format!("{}/health", healthy)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["tools"], 4);

    // Reserve a port, then free it so nothing is listening there.
    let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed_addr = closed.local_addr().unwrap();
    drop(closed);
    let broken = start_gateway(&format!("http://{}", closed_addr), None).await;
    let (status, body) = get_json(&format!("{}/health", broken)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
}

#[tokio::test]
async fn test_client_retries_transient_failures() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let flaky = Router::new().route(
        "/mcp/tools",
        get(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    (AxumStatus::SERVICE_UNAVAILABLE, axum::Json(json!({})))
                } else {
                    (AxumStatus::OK, axum::Json(json!([])))
                }
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, flaky).await;
    });

    let client = ToolClient::new(&format!("http://{}", addr), Duration::from_secs(5), fast_retry())
        .unwrap();
    let tools = client
        .list_tools(&CallContext::new(CorrelationId::new()))
        .await
        .unwrap();
    assert!(tools.is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_client_does_not_retry_client_errors() {
    let config = test_config();
    let upstream = start_tool_server(&config).await;
    let client = ToolClient::new(&format!("http://{}", upstream), Duration::from_secs(5), fast_retry())
        .unwrap()
        .with_token(Some(service_token(&config)));

    let err = client
        .call_tool("nosuchtool", &serde_json::Map::new(), &CallContext::default())
        .await
        .unwrap_err();
    match err {
        weather_mcp::Error::Upstream { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "tool not found: nosuchtool");
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}
