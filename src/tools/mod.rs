//! Tool infrastructure: coercion, catalog, dispatch, access control, telemetry.
//!
//! Tools are registered explicitly into a [`CatalogBuilder`] at startup; the
//! built catalog is immutable and the [`Dispatcher`] executes against it.

pub mod access;
pub mod catalog;
pub mod coercion;
pub mod dispatch;
pub mod health;

pub use access::{AuthorizationGate, Claim};
pub use catalog::{
    CatalogBuilder, ParamDef, ParametersSchema, PropertySchema, ToolCatalog, ToolDescriptor,
    ToolProvider, ToolSummary,
};
pub use coercion::{ArgValue, Args, CoercionTable, Coercer, ParamType};
pub use dispatch::{
    handler_fn, Dispatcher, FnHandler, InvocationRequest, InvocationResult, ToolHandler,
    ToolOutput,
};
pub use health::{
    Anomaly, HealthConfig, HealthStatus, Outcome, SystemHealthReport, ToolHealthReport,
    ToolHealthTracker,
};
