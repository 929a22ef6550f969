//! Configuration structures.
//!
//! Configuration is loaded from an optional JSON file, then environment
//! variables, then validated. Every section has a usable default except the
//! JWT secret, which must be supplied.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::tools::health::HealthConfig;
use crate::types::{Error, Result};

/// Minimum HS256 secret length in bytes.
pub const MIN_JWT_SECRET_BYTES: usize = 32;

/// Global service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Tool server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Bearer validation and claim gate configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Orchestrating gateway configuration.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Tool telemetry thresholds.
    #[serde(default)]
    pub telemetry: HealthConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Tool server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP bind address.
    pub listen_addr: String,

    /// Public base URL, advertised as the protected resource.
    pub public_url: String,

    /// Largest accepted request body.
    pub max_body_bytes: usize,

    /// Deadline for a single tool execution; `None` waits indefinitely.
    #[serde(with = "humantime_serde")]
    pub tool_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:5000".to_string(),
            public_url: "http://localhost:5000".to_string(),
            max_body_bytes: 64 * 1024,
            tool_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Bearer validation and claim gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 shared secret.
    pub jwt_secret: String,

    /// Expected `iss` claim.
    pub issuer: String,

    /// Expected `aud` claim.
    pub audience: String,

    /// Clock skew tolerance in seconds.
    pub leeway_secs: u64,

    /// Claim value a caller must carry (role or scope name).
    pub required_claim: String,

    /// Claim types under which `required_claim` is accepted.
    pub claim_types: Vec<String>,

    /// Authorization servers advertised in protected resource metadata.
    pub authorization_servers: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            issuer: "weather-mcp-dev".to_string(),
            audience: "weather-mcp".to_string(),
            leeway_secs: 30,
            required_claim: "mcp.tools".to_string(),
            claim_types: vec![
                "roles".to_string(),
                "role".to_string(),
                "scp".to_string(),
                "scope".to_string(),
                "http://schemas.microsoft.com/ws/2008/06/identity/claims/role".to_string(),
                "http://schemas.microsoft.com/identity/claims/scope".to_string(),
            ],
            authorization_servers: Vec::new(),
        }
    }
}

/// Orchestrating gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Gateway HTTP bind address.
    pub listen_addr: String,

    /// Base URL of the tool server.
    pub upstream_url: String,

    /// Bearer token used when the inbound request carries none.
    pub upstream_token: Option<String>,

    /// Per-attempt timeout for upstream calls.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Retry policy for upstream calls.
    pub retry: RetryConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:5100".to_string(),
            upstream_url: "http://127.0.0.1:5000".to_string(),
            upstream_token: None,
            request_timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }
}

/// Exponential backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,

    /// Delay before the first retry.
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,

    /// Upper bound on any single delay.
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,

    /// Growth factor between delays.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl Config {
    /// Defaults, then the JSON file at `path` (if any), then environment.
    ///
    /// Validation is left to the caller, since each service needs a
    /// different subset: see [`Config::validate_server`],
    /// [`Config::validate_gateway`] and [`Config::validate_auth`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::config(format!("cannot read {}: {}", path.display(), e))
                })?;
                serde_json::from_str(&raw).map_err(|e| {
                    Error::config(format!("invalid config file {}: {}", path.display(), e))
                })?
            }
            None => Config::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `WEATHER_MCP_*` overrides read through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("WEATHER_MCP_LISTEN_ADDR") {
            self.server.listen_addr = v;
        }
        if let Some(v) = lookup("WEATHER_MCP_PUBLIC_URL") {
            self.server.public_url = v;
        }
        if let Some(v) = lookup("WEATHER_MCP_JWT_SECRET") {
            self.auth.jwt_secret = v;
        }
        if let Some(v) = lookup("WEATHER_MCP_JWT_ISSUER") {
            self.auth.issuer = v;
        }
        if let Some(v) = lookup("WEATHER_MCP_JWT_AUDIENCE") {
            self.auth.audience = v;
        }
        if let Some(v) = lookup("WEATHER_MCP_REQUIRED_CLAIM") {
            self.auth.required_claim = v;
        }
        if let Some(v) = lookup("WEATHER_MCP_CLAIM_TYPES") {
            self.auth.claim_types = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = lookup("WEATHER_MCP_GATEWAY_ADDR") {
            self.gateway.listen_addr = v;
        }
        if let Some(v) = lookup("WEATHER_MCP_UPSTREAM_URL") {
            self.gateway.upstream_url = v;
        }
        if let Some(v) = lookup("WEATHER_MCP_UPSTREAM_TOKEN") {
            self.gateway.upstream_token = Some(v);
        }
    }

    /// Reject configurations either service cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.validate_server()?;
        self.validate_gateway()
    }

    /// Settings the tool server needs: its address and token verification.
    pub fn validate_server(&self) -> Result<()> {
        parse_addr("server.listen_addr", &self.server.listen_addr)?;
        self.validate_auth()
    }

    /// Settings needed to verify or mint tokens.
    pub fn validate_auth(&self) -> Result<()> {
        if self.auth.jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(Error::config(format!(
                "auth.jwt_secret must be at least {} bytes",
                MIN_JWT_SECRET_BYTES
            )));
        }
        if self.auth.required_claim.trim().is_empty() {
            return Err(Error::config("auth.required_claim cannot be empty"));
        }
        if self.auth.claim_types.is_empty() {
            return Err(Error::config("auth.claim_types cannot be empty"));
        }
        Ok(())
    }

    /// Settings the gateway needs. It never verifies tokens, so no secret is required.
    pub fn validate_gateway(&self) -> Result<()> {
        parse_addr("gateway.listen_addr", &self.gateway.listen_addr)?;

        let upstream = &self.gateway.upstream_url;
        if !(upstream.starts_with("http://") || upstream.starts_with("https://")) {
            return Err(Error::config(format!(
                "gateway.upstream_url must be an http(s) URL, got '{}'",
                upstream
            )));
        }

        let retry = &self.gateway.retry;
        if retry.max_attempts == 0 {
            return Err(Error::config("gateway.retry.max_attempts must be at least 1"));
        }
        if retry.multiplier < 1.0 {
            return Err(Error::config("gateway.retry.multiplier must be >= 1.0"));
        }
        if retry.initial_backoff > retry.max_backoff {
            return Err(Error::config(
                "gateway.retry.initial_backoff cannot exceed max_backoff",
            ));
        }
        Ok(())
    }

    pub fn server_addr(&self) -> Result<SocketAddr> {
        parse_addr("server.listen_addr", &self.server.listen_addr)
    }

    pub fn gateway_addr(&self) -> Result<SocketAddr> {
        parse_addr("gateway.listen_addr", &self.gateway.listen_addr)
    }
}

fn parse_addr(field: &str, value: &str) -> Result<SocketAddr> {
    value
        .parse()
        .map_err(|_| Error::config(format!("{} is not a socket address: '{}'", field, value)))
}
