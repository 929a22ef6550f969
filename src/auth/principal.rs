//! Authenticated caller and its flattened claim set.

use crate::tools::Claim;
use serde_json::{Map, Value};

/// Claim types whose string value is a space-separated list.
const SPACE_DELIMITED: &[&str] = &["scp", "scope"];

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    subject: String,
    claims: Vec<Claim>,
}

impl Principal {
    pub fn new(subject: impl Into<String>, claims: Vec<Claim>) -> Self {
        Self {
            subject: subject.into(),
            claims,
        }
    }

    /// Flatten a decoded JWT payload into `(type, value)` pairs.
    ///
    /// Arrays yield one pair per element; `scp`/`scope` strings are split on
    /// whitespace. Nested objects and nulls are skipped.
    pub fn from_jwt_claims(payload: &Map<String, Value>) -> Self {
        let subject = payload
            .get("sub")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut claims = Vec::new();
        for (claim_type, value) in payload {
            match value {
                Value::String(s) if SPACE_DELIMITED.contains(&claim_type.as_str()) => {
                    claims.extend(s.split_whitespace().map(|v| Claim::new(claim_type, v)));
                }
                Value::Array(items) => {
                    claims.extend(
                        items
                            .iter()
                            .filter_map(scalar_text)
                            .map(|v| Claim::new(claim_type, v)),
                    );
                }
                other => {
                    if let Some(v) = scalar_text(other) {
                        claims.push(Claim::new(claim_type, v));
                    }
                }
            }
        }

        Self { subject, claims }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// Every value carried under `claim_type`.
    pub fn values<'a>(&'a self, claim_type: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.claims
            .iter()
            .filter(move |c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_arrays_expand() {
        let p = Principal::from_jwt_claims(&payload(json!({
            "sub": "alice",
            "roles": ["reader", "mcp.tools"],
        })));
        assert_eq!(p.subject(), "alice");
        let roles: Vec<&str> = p.values("roles").collect();
        assert_eq!(roles, vec!["reader", "mcp.tools"]);
    }

    #[test]
    fn test_scope_string_split() {
        let p = Principal::from_jwt_claims(&payload(json!({
            "sub": "svc",
            "scp": "openid  mcp.tools profile",
        })));
        let scopes: Vec<&str> = p.values("scp").collect();
        assert_eq!(scopes, vec!["openid", "mcp.tools", "profile"]);
    }

    #[test]
    fn test_plain_string_not_split() {
        let p = Principal::from_jwt_claims(&payload(json!({"role": "mcp tools"})));
        assert_eq!(p.values("role").collect::<Vec<_>>(), vec!["mcp tools"]);
    }

    #[test]
    fn test_scalars_and_objects() {
        let p = Principal::from_jwt_claims(&payload(json!({
            "exp": 1700000000,
            "email_verified": true,
            "address": {"city": "Austin"},
            "nickname": null,
        })));
        assert_eq!(p.values("exp").collect::<Vec<_>>(), vec!["1700000000"]);
        assert_eq!(p.values("email_verified").collect::<Vec<_>>(), vec!["true"]);
        assert_eq!(p.values("address").count(), 0);
        assert_eq!(p.values("nickname").count(), 0);
        assert_eq!(p.subject(), "");
    }
}
