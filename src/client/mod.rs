//! Consumers of the tool server: the HTTP client and the gateway built on it.

pub mod gateway;
mod retry;
mod tool_client;

pub use gateway::{gateway_router, GatewayServer, GatewayState};
pub use retry::{is_retryable, RetryPolicy};
pub use tool_client::{CallContext, ToolClient};
