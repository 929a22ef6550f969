//! HTTP tool server: axum router, request pipeline, serve loop.
//!
//! Per request: correlation middleware → bearer validation (401) →
//! authorization gate (403) → body parse (400) → dispatch.

mod handlers;
mod middleware;
mod state;

pub use middleware::{correlation, Authorized};
pub use state::AppState;

use crate::types::{Config, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Build the tool server router.
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/mcp/tools", get(handlers::list_tools))
        .route("/mcp/tools/{tool_name}", post(handlers::execute_tool))
        .route("/health", get(handlers::health))
        .route(
            "/.well-known/oauth-protected-resource",
            get(handlers::protected_resource),
        )
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(axum::middleware::from_fn(correlation))
        .with_state(state)
}

/// HTTP server wrapping the tool dispatcher.
#[derive(Debug)]
pub struct HttpServer {
    state: AppState,
    addr: SocketAddr,
    max_body_bytes: usize,
    cancel: CancellationToken,
}

impl HttpServer {
    pub fn new(state: AppState, addr: SocketAddr, max_body_bytes: usize) -> Self {
        Self {
            state,
            addr,
            max_body_bytes,
            cancel: CancellationToken::new(),
        }
    }

    /// Server for the weather tools, configured from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate_server()?;
        Ok(Self::new(
            AppState::from_config(config)?,
            config.server_addr()?,
            config.server.max_body_bytes,
        ))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone(), self.max_body_bytes)
    }

    /// Bind the configured address and serve until cancelled.
    pub async fn serve(&self) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve_listener(listener).await
    }

    /// Serve on an already-bound listener until cancelled.
    pub async fn serve_listener(&self, listener: TcpListener) -> Result<()> {
        let local = listener.local_addr()?;
        tracing::info!(
            addr = %local,
            tools = self.state.dispatcher.catalog().len(),
            "tool server listening"
        );

        let cancel = self.cancel.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;

        tracing::info!("tool server shut down");
        Ok(())
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
