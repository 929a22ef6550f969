//! Tool access control: claim check evaluated before any dispatch.
//!
//! Identity providers emit the same role or scope under different claim type
//! strings, so the gate accepts the required value under any configured
//! alias. Matching is exact and case-sensitive.

use crate::types::{AuthConfig, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One `(type, value)` assertion about the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    pub claim_type: String,
    pub value: String,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

/// Required claim value + accepted claim-type aliases.
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    required_value: String,
    claim_types: HashSet<String>,
}

impl AuthorizationGate {
    pub fn new<I, S>(required_value: impl Into<String>, claim_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required_value: required_value.into(),
            claim_types: claim_types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.required_claim.clone(), config.claim_types.iter().cloned())
    }

    pub fn required_value(&self) -> &str {
        &self.required_value
    }

    /// True iff some claim carries the required value under an accepted alias.
    pub fn check<'a, I>(&self, claims: I) -> bool
    where
        I: IntoIterator<Item = &'a Claim>,
    {
        claims
            .into_iter()
            .any(|c| c.value == self.required_value && self.claim_types.contains(&c.claim_type))
    }

    /// [`AuthorizationGate::check`] as a `Result`.
    pub fn authorize<'a, I>(&self, subject: &str, claims: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Claim>,
    {
        if self.check(claims) {
            Ok(())
        } else {
            tracing::warn!(subject, required = %self.required_value, "claim check failed");
            Err(Error::denied(format!(
                "caller lacks required claim '{}'",
                self.required_value
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> AuthorizationGate {
        AuthorizationGate::new(
            "mcp.tools",
            ["roles", "http://schemas.microsoft.com/ws/2008/06/identity/claims/role"],
        )
    }

    #[test]
    fn test_matches_under_any_alias() {
        let g = gate();
        assert!(g.check(&[Claim::new("roles", "mcp.tools")]));
        assert!(g.check(&[Claim::new(
            "http://schemas.microsoft.com/ws/2008/06/identity/claims/role",
            "mcp.tools"
        )]));
    }

    #[test]
    fn test_rejects_wrong_type_or_value() {
        let g = gate();
        assert!(!g.check(&[Claim::new("scp", "mcp.tools")]));
        assert!(!g.check(&[Claim::new("roles", "mcp.admin")]));
        assert!(!g.check(&[Claim::new("roles", "MCP.TOOLS")]));
        assert!(!g.check(&[]));
    }

    #[test]
    fn test_any_matching_pair_suffices() {
        let claims = vec![
            Claim::new("sub", "alice"),
            Claim::new("roles", "reader"),
            Claim::new("roles", "mcp.tools"),
        ];
        assert!(gate().check(&claims));
    }

    #[test]
    fn test_authorize_denied() {
        let err = gate()
            .authorize("alice", &[Claim::new("roles", "reader")])
            .unwrap_err();
        assert!(matches!(err, Error::AuthorizationDenied(_)));
    }

    #[test]
    fn test_from_config_defaults() {
        let g = AuthorizationGate::from_config(&AuthConfig::default());
        assert_eq!(g.required_value(), "mcp.tools");
        assert!(g.check(&[Claim::new("scp", "mcp.tools")]));
        assert!(g.check(&[Claim::new("role", "mcp.tools")]));
    }
}
