//! Core types shared by the tool server and the gateway.
//!
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures and loading
//! - **IDs**: Correlation identifiers

mod config;
mod errors;
mod ids;

pub use config::{
    AuthConfig, Config, GatewayConfig, ObservabilityConfig, RetryConfig, ServerConfig,
    MIN_JWT_SECRET_BYTES,
};
pub use errors::{Error, Result, ToolFailure};
pub use ids::{CorrelationId, CORRELATION_HEADER, MAX_CORRELATION_ID_LEN};
