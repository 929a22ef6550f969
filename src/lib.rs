//! # Weather MCP - Tool Registry and Dispatch over HTTP
//!
//! Mock weather tools exposed over HTTP behind bearer authentication and a
//! claim-based authorization gate, plus a gateway that orchestrates calls to
//! them:
//! - Explicit tool registration into an immutable catalog
//! - Pluggable JSON → native parameter coercion
//! - Async dispatch with structured, status-mapped errors
//! - Per-tool telemetry with anomaly detection
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────────────── tool server ────────────────────────┐
//!   gateway  →    │ correlation → bearer (401) → gate (403) → Dispatcher        │
//!  (ToolClient)   │                                            │                │
//!                 │                              ToolCatalog ──┴── CoercionTable│
//!                 │                                   │                         │
//!                 │                              WeatherTools                   │
//!                 └─────────────────────────────────────────────────────────────┘
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod auth;
pub mod client;
pub mod server;
pub mod tools;
pub mod types;
pub mod weather;

// Internal utilities
pub mod observability;

pub use types::{Config, Error, Result};
