//! HS256 bearer token validation and dev token minting.

use crate::auth::Principal;
use crate::types::{AuthConfig, Error, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// Upper bound on an `Authorization` header we are willing to parse.
pub const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

/// Extract the token from `Authorization: Bearer <token>`.
pub fn parse_bearer_token(header: Option<&str>) -> Result<&str> {
    let header = header.ok_or_else(|| Error::unauthenticated("missing authorization header"))?;
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(Error::unauthenticated("authorization header too large"));
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(Error::unauthenticated("invalid authorization header"));
    }
    Ok(token)
}

/// Validates bearer tokens against the configured secret, issuer and audience.
#[derive(Clone)]
pub struct JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        if config.jwt_secret.is_empty() {
            return Err(Error::config("auth.jwt_secret is not set"));
        }
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = config.leeway_secs;

        Ok(Self {
            key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        })
    }

    /// Decode and verify `token`.
    pub fn validate(&self, token: &str) -> Result<Principal> {
        let data = decode::<Map<String, Value>>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "bearer token rejected");
            Error::unauthenticated(format!("invalid token: {}", e))
        })?;
        Ok(Principal::from_jwt_claims(&data.claims))
    }

    /// Parse the `Authorization` header value and validate its token.
    pub fn authenticate(&self, header: Option<&str>) -> Result<Principal> {
        self.validate(parse_bearer_token(header)?)
    }
}

impl fmt::Debug for JwtValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtValidator")
            .field("iss", &self.validation.iss)
            .field("aud", &self.validation.aud)
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct MintedClaims<'a> {
    sub: &'a str,
    iss: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
    roles: &'a [String],
}

/// Issue an HS256 token accepted by [`JwtValidator`] under the same config.
pub fn mint_token(
    config: &AuthConfig,
    subject: &str,
    roles: &[String],
    ttl: Duration,
) -> Result<String> {
    if config.jwt_secret.is_empty() {
        return Err(Error::config("auth.jwt_secret is not set"));
    }
    let iat = Utc::now().timestamp();
    let ttl_secs = i64::try_from(ttl.as_secs())
        .map_err(|_| Error::validation("token ttl is too large"))?;
    let claims = MintedClaims {
        sub: subject,
        iss: &config.issuer,
        aud: &config.audience,
        iat,
        exp: iat.saturating_add(ttl_secs),
        roles,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| Error::internal(format!("token encoding failed: {}", e)))
}
