//! Strongly-typed identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Header carrying the correlation id, in both directions.
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Longest correlation id accepted from a caller.
pub const MAX_CORRELATION_ID_LEN: usize = 128;

/// Correlation id carried across the gateway → tool server hop.
///
/// Caller-supplied ids are accepted when non-empty, at most
/// [`MAX_CORRELATION_ID_LEN`] bytes, and made of visible ASCII only
/// (they are echoed back as a header value).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Fresh UUID v4 id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn parse(s: &str) -> Result<Self, &'static str> {
        if s.is_empty() {
            return Err("CorrelationId cannot be empty");
        }
        if s.len() > MAX_CORRELATION_ID_LEN {
            return Err("CorrelationId too long");
        }
        if !s.bytes().all(|b| b.is_ascii_graphic()) {
            return Err("CorrelationId must be visible ASCII");
        }
        Ok(Self(s.to_string()))
    }

    /// Reuse the caller's id when it is acceptable, otherwise mint one.
    pub fn from_header(value: Option<&str>) -> Self {
        value
            .and_then(|v| Self::parse(v.trim()).ok())
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_header_reuses_valid_id() {
        let id = CorrelationId::from_header(Some("req-123"));
        assert_eq!(id.as_str(), "req-123");
    }

    #[test]
    fn test_from_header_replaces_invalid_id() {
        let blank = CorrelationId::from_header(Some("  "));
        assert!(uuid::Uuid::parse_str(blank.as_str()).is_ok());

        let spaced = CorrelationId::from_header(Some("has space"));
        assert_ne!(spaced.as_str(), "has space");

        let long = "x".repeat(MAX_CORRELATION_ID_LEN + 1);
        assert_ne!(CorrelationId::from_header(Some(&long)).as_str(), long);

        assert!(!CorrelationId::from_header(None).as_str().is_empty());
    }
}
