//! Shared request state.

use crate::auth::{JwtValidator, ProtectedResourceMetadata};
use crate::tools::{
    AuthorizationGate, CatalogBuilder, Dispatcher, InvocationResult, Outcome, ToolHealthTracker,
};
use crate::types::{Config, Result};
use crate::weather::WeatherTools;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Everything a handler needs. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub validator: Arc<JwtValidator>,
    pub gate: Arc<AuthorizationGate>,
    pub telemetry: Arc<Mutex<ToolHealthTracker>>,
    pub metadata: Arc<ProtectedResourceMetadata>,
    pub tool_timeout: Option<Duration>,
}

impl AppState {
    /// State over an already-built dispatcher.
    pub fn new(dispatcher: Dispatcher, config: &Config) -> Result<Self> {
        let mut tracker = ToolHealthTracker::new(config.telemetry.clone());
        tracker.set_registered_tools(dispatcher.catalog().list_names());

        Ok(Self {
            validator: Arc::new(JwtValidator::new(&config.auth)?),
            gate: Arc::new(AuthorizationGate::from_config(&config.auth)),
            telemetry: Arc::new(Mutex::new(tracker)),
            metadata: Arc::new(ProtectedResourceMetadata::from_config(
                &config.server,
                &config.auth,
            )),
            tool_timeout: config.server.tool_timeout,
            dispatcher,
        })
    }

    /// State serving the weather tools.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = CatalogBuilder::new();
        builder.register_provider(&WeatherTools)?;
        let dispatcher = Dispatcher::new(Arc::new(builder.build()));
        Self::new(dispatcher, config)
    }

    /// Feed one execution into telemetry. Unknown tool names are not tracked.
    pub async fn record(&self, tool_name: &str, result: &InvocationResult, elapsed: Duration) {
        let Some(tool) = self.dispatcher.catalog().get(tool_name) else {
            return;
        };
        let outcome = Outcome::of(result);
        let latency_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.telemetry
            .lock()
            .await
            .record(&tool.name, outcome, latency_ms);
    }
}
