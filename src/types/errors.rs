//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation. Every
//! variant maps to an HTTP status and a stable `kind` tag so that nothing
//! reaches the transport layer unformatted.

use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure raised by a tool body.
///
/// Bodies separate recognised input validation (the caller's fault) from
/// unexpected failures (ours), so the boundary can answer 400 vs 500.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolFailure {
    /// Domain validation failed (e.g. day count out of range).
    #[error("{0}")]
    Validation(String),

    /// Unexpected failure inside the tool body.
    #[error("{0}")]
    Internal(String),
}

impl ToolFailure {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Main error enum for the weather tool service.
#[derive(Error, Debug)]
pub enum Error {
    /// Requested tool is not in the catalog (404).
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Required parameter absent from the request body (400).
    #[error("missing required parameter '{parameter}' for tool '{tool}'")]
    MissingParameter { tool: String, parameter: String },

    /// Provided value cannot be converted to the declared type (400).
    #[error("parameter '{parameter}' expects {expected}: {message}")]
    TypeCoercion {
        parameter: String,
        expected: String,
        message: String,
    },

    /// The tool body itself failed (400 for validation, 500 otherwise).
    #[error("tool '{tool}' failed: {source}")]
    ToolExecution {
        tool: String,
        #[source]
        source: ToolFailure,
    },

    /// Missing or invalid bearer credentials (401).
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Claim check failed (403).
    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),

    /// Two tools (or two parameters) claim the same name at startup.
    #[error("registration conflict: {0}")]
    RegistrationConflict(String),

    /// Malformed request (400).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body exceeds the configured limit (413).
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Non-success answer from the upstream tool server.
    #[error("upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Deadline elapsed before the tool body completed (504).
    #[error("timeout: {0}")]
    Timeout(String),

    /// Internal errors (500).
    #[error("internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Outbound HTTP transport errors.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::ToolNotFound(_) => StatusCode::NOT_FOUND,
            Error::MissingParameter { .. } | Error::TypeCoercion { .. } | Error::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::ToolExecution { source, .. } => match source {
                ToolFailure::Validation(_) => StatusCode::BAD_REQUEST,
                ToolFailure::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Error::AuthorizationDenied(_) => StatusCode::FORBIDDEN,
            Error::Upstream { status, .. } => match StatusCode::from_u16(*status) {
                Ok(code) if code.is_client_error() => code,
                _ => StatusCode::BAD_GATEWAY,
            },
            Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::RegistrationConflict(_)
            | Error::Config(_)
            | Error::Internal(_)
            | Error::Serialization(_)
            | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable snake_case tag used in structured error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ToolNotFound(_) => "tool_not_found",
            Error::MissingParameter { .. } => "missing_parameter",
            Error::TypeCoercion { .. } => "type_coercion",
            Error::ToolExecution { source, .. } => match source {
                ToolFailure::Validation(_) => "tool_validation",
                ToolFailure::Internal(_) => "tool_execution",
            },
            Error::Unauthenticated(_) => "unauthenticated",
            Error::AuthorizationDenied(_) => "authorization_denied",
            Error::RegistrationConflict(_) => "registration_conflict",
            Error::Validation(_) => "invalid_request",
            Error::PayloadTooLarge(_) => "payload_too_large",
            Error::Config(_) => "configuration",
            Error::Upstream { .. } => "upstream",
            Error::Timeout(_) => "timeout",
            Error::Internal(_) => "internal",
            Error::Serialization(_) => "serialization",
            Error::Http(_) => "http",
            Error::Io(_) => "io",
        }
    }

    /// Structured body: `{"error": {"kind": ..., "message": ...}}`.
    pub fn to_body(&self) -> serde_json::Value {
        let message = match self {
            // Unexpected failures are logged in full but not echoed back.
            Error::ToolExecution {
                source: ToolFailure::Internal(_),
                tool,
            } => format!("tool '{}' failed unexpectedly", tool),
            Error::Internal(_) | Error::Io(_) | Error::Serialization(_) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        serde_json::json!({
            "error": {
                "kind": self.kind(),
                "message": message,
            }
        })
    }
}

// Convenience constructors
impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound(tool.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn denied(msg: impl Into<String>) -> Self {
        Self::AuthorizationDenied(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::RegistrationConflict(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

// axum extractor rejections, so they answer with the structured body too.
impl Error {
    fn from_rejection(status: StatusCode, text: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(text)
        } else {
            Self::Validation(text)
        }
    }
}

impl From<BytesRejection> for Error {
    fn from(rejection: BytesRejection) -> Self {
        Self::from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::from_rejection(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "request failed");
        } else {
            tracing::debug!(kind = self.kind(), error = %self, "request rejected");
        }
        let body = axum::Json(self.to_body());
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}
