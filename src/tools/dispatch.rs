//! Dispatcher: resolve a tool by name, coerce its arguments, run its body.
//!
//! The dispatcher holds only an `Arc` of the immutable catalog, so any number
//! of invocations can run concurrently without locking. The single suspension
//! point is awaiting the tool body.

use crate::tools::catalog::{ToolCatalog, ToolDescriptor, ToolSummary};
use crate::tools::coercion::Args;
use crate::types::{Error, Result, ToolFailure};
use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

// =============================================================================
// Tool bodies
// =============================================================================

/// What a tool body produces on success.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Json(Value),
    /// No meaningful return; surfaces as `{"success": true}`.
    Empty,
}

impl ToolOutput {
    /// Serialize any value as tool output.
    pub fn json<T: Serialize>(value: &T) -> std::result::Result<Self, ToolFailure> {
        serde_json::to_value(value)
            .map(ToolOutput::Json)
            .map_err(|e| ToolFailure::internal(format!("result serialization failed: {}", e)))
    }

    pub fn into_value(self) -> Value {
        match self {
            ToolOutput::Json(value) => value,
            ToolOutput::Empty => serde_json::json!({ "success": true }),
        }
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        ToolOutput::Json(value)
    }
}

/// The single capability every tool body implements.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: Args) -> std::result::Result<ToolOutput, ToolFailure>;
}

/// Adapter turning an async closure into a [`ToolHandler`].
#[derive(Debug, Clone)]
pub struct FnHandler<F> {
    f: F,
}

/// Wrap `f` as a tool body.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Args) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<ToolOutput, ToolFailure>> + Send + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Args) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<ToolOutput, ToolFailure>> + Send + 'static,
{
    async fn call(&self, args: Args) -> std::result::Result<ToolOutput, ToolFailure> {
        (self.f)(args).await
    }
}

// =============================================================================
// Invocation
// =============================================================================

/// One request to run a tool. Transient; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    pub tool: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl InvocationRequest {
    pub fn new(tool: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            tool: tool.into(),
            params,
        }
    }
}

/// Success payload or structured failure.
pub type InvocationResult = Result<Value>;

/// Stateless executor over a shared, read-only catalog.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    catalog: Arc<ToolCatalog>,
}

impl Dispatcher {
    pub fn new(catalog: Arc<ToolCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Schema export.
    pub fn list_tools(&self) -> Vec<ToolSummary> {
        self.catalog.summaries()
    }

    /// Resolve the tool and coerce every parameter in declaration order.
    ///
    /// Stops at the first failure; nothing is executed.
    pub fn prepare(&self, name: &str, params: &Map<String, Value>) -> Result<(&ToolDescriptor, Args)> {
        let tool = self
            .catalog
            .get(name)
            .ok_or_else(|| Error::not_found(name))?;

        let coercions = self.catalog.coercions();
        let mut args = Args::new();
        for param in &tool.parameters {
            let value = coercions.coerce_param(&tool.name, param, params.get(&param.name))?;
            args.push(param.name.clone(), value);
        }

        for key in params.keys() {
            if !tool.parameters.iter().any(|p| &p.name == key) {
                tracing::debug!(tool = %tool.name, parameter = %key, "ignoring undeclared parameter");
            }
        }

        Ok((tool, args))
    }

    /// Run `name` with `params`. No timeout is imposed here.
    pub async fn execute(&self, name: &str, params: &Map<String, Value>) -> InvocationResult {
        let started = Instant::now();
        let (tool, args) = self.prepare(name, params)?;

        let outcome = AssertUnwindSafe(tool.handler().call(args))
            .catch_unwind()
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(output)) => {
                tracing::info!(tool = %tool.name, elapsed_ms, "tool executed");
                Ok(output.into_value())
            }
            Ok(Err(failure)) => {
                tracing::warn!(tool = %tool.name, elapsed_ms, error = %failure, "tool failed");
                Err(Error::ToolExecution {
                    tool: tool.name.clone(),
                    source: failure,
                })
            }
            Err(_) => {
                tracing::error!(tool = %tool.name, elapsed_ms, "tool body panicked");
                Err(Error::ToolExecution {
                    tool: tool.name.clone(),
                    source: ToolFailure::internal("tool body panicked"),
                })
            }
        }
    }

    /// Run a transient request.
    pub async fn invoke(&self, request: &InvocationRequest) -> InvocationResult {
        self.execute(&request.tool, &request.params).await
    }

    /// As [`Dispatcher::execute`], abandoning the body after `deadline`.
    pub async fn execute_with_deadline(
        &self,
        name: &str,
        params: &Map<String, Value>,
        deadline: Duration,
    ) -> InvocationResult {
        tokio::time::timeout(deadline, self.execute(name, params))
            .await
            .map_err(|_| {
                Error::timeout(format!(
                    "tool '{}' did not complete within {}ms",
                    name,
                    deadline.as_millis()
                ))
            })?
    }
}

// =============================================================================
// Tests
// =============================================================================
