//! HTTP client for the tool server.

use crate::client::RetryPolicy;
use crate::tools::ToolSummary;
use crate::types::{CorrelationId, Error, GatewayConfig, Result, CORRELATION_HEADER};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, Response};
use serde_json::{Map, Value};
use std::time::Duration;

/// Per-call credentials and correlation.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Full `Authorization` header value to forward, if the caller sent one.
    pub authorization: Option<String>,
    pub correlation_id: CorrelationId,
}

impl CallContext {
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self {
            authorization: None,
            correlation_id,
        }
    }

    pub fn with_authorization(mut self, authorization: Option<String>) -> Self {
        self.authorization = authorization;
        self
    }
}

/// Calls `GET /mcp/tools` and `POST /mcp/tools/{name}` on a tool server.
#[derive(Debug, Clone)]
pub struct ToolClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    retry: RetryPolicy,
}

impl ToolClient {
    pub fn new(base_url: &str, request_timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            retry,
        })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        Ok(Self::new(
            &config.upstream_url,
            config.request_timeout,
            RetryPolicy::from_config(&config.retry),
        )?
        .with_token(config.upstream_token.clone()))
    }

    /// Bearer token used when the call context carries no `Authorization`.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// Same client, single attempt.
    pub fn without_retry(&self) -> Self {
        Self {
            retry: RetryPolicy::none(),
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn list_tools(&self, ctx: &CallContext) -> Result<Vec<ToolSummary>> {
        let value = self.send(Method::GET, "/mcp/tools", None, ctx).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn call_tool(
        &self,
        name: &str,
        params: &Map<String, Value>,
        ctx: &CallContext,
    ) -> Result<Value> {
        let path = format!("/mcp/tools/{}", name);
        self.send(Method::POST, &path, Some(params), ctx).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Map<String, Value>>,
        ctx: &CallContext,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let authorization = ctx
            .authorization
            .clone()
            .or_else(|| self.token.as_ref().map(|t| format!("Bearer {}", t)));

        self.retry
            .run(path, || {
                let mut request = self
                    .http
                    .request(method.clone(), &url)
                    .header(CORRELATION_HEADER, ctx.correlation_id.as_str());
                if let Some(auth) = &authorization {
                    request = request.header(AUTHORIZATION, auth.as_str());
                }
                if let Some(body) = body {
                    request = request.json(body);
                }
                async move { read_response(request.send().await?).await }
            })
            .await
    }
}

/// 2xx → JSON body; anything else → [`Error::Upstream`].
async fn read_response(response: Response) -> Result<Value> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<Value>().await?);
    }

    let text = response.text().await.unwrap_or_default();
    Err(Error::Upstream {
        status: status.as_u16(),
        message: upstream_message(&text),
    })
}

/// Prefer the structured `{"error": {"message": ..}}` text when present.
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
