//! Bearer authentication.
//!
//! Tokens are validated here; whether a validated caller may use the tools
//! is decided by [`crate::tools::AuthorizationGate`].

mod jwt;
mod principal;

pub use jwt::{mint_token, parse_bearer_token, JwtValidator, MAX_AUTH_HEADER_BYTES};
pub use principal::Principal;

use crate::types::{AuthConfig, ServerConfig};
use serde::{Deserialize, Serialize};

/// OAuth 2.0 protected resource metadata (RFC 9728).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    pub resource: String,
    pub authorization_servers: Vec<String>,
    pub scopes_supported: Vec<String>,
    pub bearer_methods_supported: Vec<String>,
}

impl ProtectedResourceMetadata {
    pub fn from_config(server: &ServerConfig, auth: &AuthConfig) -> Self {
        Self {
            resource: server.public_url.trim_end_matches('/').to_string(),
            authorization_servers: auth.authorization_servers.clone(),
            scopes_supported: vec![auth.required_claim.clone()],
            bearer_methods_supported: vec!["header".to_string()],
        }
    }
}
