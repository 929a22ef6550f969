//! HTTP handlers for the tool server.

use crate::auth::ProtectedResourceMetadata;
use crate::server::{AppState, Authorized};
use crate::tools::ToolSummary;
use crate::types::{Error, Result};
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, State};
use axum::Json;
use bytes::Bytes;
use serde_json::{json, Map, Value};
use std::time::Instant;

/// `GET /mcp/tools`
pub async fn list_tools(
    State(state): State<AppState>,
    _auth: Authorized,
) -> Json<Vec<ToolSummary>> {
    Json(state.dispatcher.list_tools())
}

/// `POST /mcp/tools/{tool_name}`
pub async fn execute_tool(
    State(state): State<AppState>,
    Path(tool_name): Path<String>,
    Authorized(principal): Authorized,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<Value>> {
    let params = parse_params(&body?)?;
    tracing::debug!(tool = %tool_name, subject = principal.subject(), "executing tool");

    let started = Instant::now();
    let result = match state.tool_timeout {
        Some(deadline) => {
            state
                .dispatcher
                .execute_with_deadline(&tool_name, &params, deadline)
                .await
        }
        None => state.dispatcher.execute(&tool_name, &params).await,
    };
    state.record(&tool_name, &result, started.elapsed()).await;

    result.map(Json)
}

/// Request body → parameter bag. An empty body means no parameters.
fn parse_params(body: &[u8]) -> Result<Map<String, Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(Error::validation(format!(
            "request body must be a JSON object, got {}",
            crate::tools::coercion::value_type_name(&other)
        ))),
        Err(e) => Err(Error::validation(format!("request body is not valid JSON: {}", e))),
    }
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let report = state.telemetry.lock().await.check_system_health();
    Json(json!({
        "status": report.status,
        "tools": state.dispatcher.catalog().len(),
        "telemetry": report.tools,
    }))
}

/// `GET /.well-known/oauth-protected-resource`
pub async fn protected_resource(State(state): State<AppState>) -> Json<ProtectedResourceMetadata> {
    Json(state.metadata.as_ref().clone())
}
