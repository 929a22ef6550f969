//! Orchestrating gateway: REST-style weather endpoints backed by tool calls.

use crate::client::{CallContext, ToolClient};
use crate::server::correlation;
use crate::types::{Config, CorrelationId, Error, Result};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Gateway request state.
#[derive(Debug, Clone)]
pub struct GatewayState {
    pub client: ToolClient,
}

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    pub days: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CurrentQuery {
    pub city: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    pub severity: Option<String>,
}

pub fn gateway_router(state: GatewayState) -> Router {
    Router::new()
        .route("/weather/{state}/forecast", get(forecast))
        .route("/weather/{state}/current", get(current))
        .route("/weather/{state}/alerts", get(alerts))
        .route("/tools", get(tools))
        .route("/health", get(health))
        .layer(axum::middleware::from_fn(correlation))
        .with_state(state)
}

/// Inbound `Authorization` is forwarded as-is; otherwise the client's own token applies.
fn call_context(headers: &HeaderMap, correlation_id: CorrelationId) -> CallContext {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    CallContext::new(correlation_id).with_authorization(authorization)
}

fn state_param(state: String) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("state".to_string(), Value::String(state));
    params
}

async fn forecast(
    State(gw): State<GatewayState>,
    Path(state): Path<String>,
    query: std::result::Result<Query<ForecastQuery>, QueryRejection>,
    Extension(correlation_id): Extension<CorrelationId>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let Query(query) = query?;
    let mut params = state_param(state);
    if let Some(days) = query.days {
        params.insert("days".to_string(), json!(days));
    }
    let ctx = call_context(&headers, correlation_id);
    gw.client
        .call_tool("getweatherforecast", &params, &ctx)
        .await
        .map(Json)
}

async fn current(
    State(gw): State<GatewayState>,
    Path(state): Path<String>,
    query: std::result::Result<Query<CurrentQuery>, QueryRejection>,
    Extension(correlation_id): Extension<CorrelationId>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let Query(query) = query?;
    let mut params = state_param(state);
    if let Some(city) = query.city {
        params.insert("city".to_string(), Value::String(city));
    }
    let ctx = call_context(&headers, correlation_id);
    gw.client
        .call_tool("getcurrentweather", &params, &ctx)
        .await
        .map(Json)
}

async fn alerts(
    State(gw): State<GatewayState>,
    Path(state): Path<String>,
    query: std::result::Result<Query<AlertsQuery>, QueryRejection>,
    Extension(correlation_id): Extension<CorrelationId>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let Query(query) = query?;
    let mut params = state_param(state);
    if let Some(severity) = query.severity {
        params.insert("severity".to_string(), Value::String(severity));
    }
    let ctx = call_context(&headers, correlation_id);
    gw.client
        .call_tool("getweatheralerts", &params, &ctx)
        .await
        .map(Json)
}

async fn tools(
    State(gw): State<GatewayState>,
    Extension(correlation_id): Extension<CorrelationId>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let ctx = call_context(&headers, correlation_id);
    let tools = gw.client.list_tools(&ctx).await?;
    Ok(Json(json!({ "count": tools.len(), "tools": tools })))
}

/// Probe the tool server once, without retries.
async fn health(
    State(gw): State<GatewayState>,
    Extension(correlation_id): Extension<CorrelationId>,
) -> Response {
    let probe = gw.client.without_retry();
    let upstream = gw.client.base_url();
    match probe.list_tools(&CallContext::new(correlation_id)).await {
        Ok(tools) => Json(json!({
            "status": "healthy",
            "upstream": upstream,
            "tools": tools.len(),
        }))
        .into_response(),
        // Reachable, but refused our credentials or request.
        Err(Error::Upstream { status, message }) if status < 500 => Json(json!({
            "status": "degraded",
            "upstream": upstream,
            "error": format!("upstream returned {}: {}", status, message),
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!(upstream, error = %e, "upstream health probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "upstream": upstream,
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// The gateway HTTP service.
#[derive(Debug)]
pub struct GatewayServer {
    state: GatewayState,
    addr: SocketAddr,
    cancel: CancellationToken,
}

impl GatewayServer {
    pub fn new(client: ToolClient, addr: SocketAddr) -> Self {
        Self {
            state: GatewayState { client },
            addr,
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate_gateway()?;
        Ok(Self::new(
            ToolClient::from_config(&config.gateway)?,
            config.gateway_addr()?,
        ))
    }

    pub fn router(&self) -> Router {
        gateway_router(self.state.clone())
    }

    pub async fn serve(&self) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve_listener(listener).await
    }

    pub async fn serve_listener(&self, listener: TcpListener) -> Result<()> {
        tracing::info!(
            addr = %listener.local_addr()?,
            upstream = self.state.client.base_url(),
            "gateway listening"
        );
        let cancel = self.cancel.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;
        tracing::info!("gateway shut down");
        Ok(())
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_call_context_forwards_authorization() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer inbound"));
        let ctx = call_context(&headers, CorrelationId::new());
        assert_eq!(ctx.authorization.as_deref(), Some("Bearer inbound"));

        let ctx = call_context(&HeaderMap::new(), CorrelationId::new());
        assert!(ctx.authorization.is_none());
    }

    #[test]
    fn test_state_param() {
        let params = state_param("tx".to_string());
        assert_eq!(params["state"], "tx");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_from_config_without_jwt_secret() {
        let config = Config::default();
        assert!(config.auth.jwt_secret.is_empty());
        assert!(GatewayServer::from_config(&config).is_ok());

        let mut config = Config::default();
        config.gateway.upstream_url = "localhost:5000".into();
        assert!(matches!(
            GatewayServer::from_config(&config).unwrap_err(),
            Error::Config(_)
        ));
    }
}
