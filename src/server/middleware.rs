//! Request pipeline pieces: correlation ids and the bearer + claim check.

use crate::auth::Principal;
use crate::server::AppState;
use crate::types::{CorrelationId, Error, CORRELATION_HEADER};
use axum::extract::{FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;

/// Reuse or mint the request's correlation id, run the rest of the stack in
/// a span carrying it, and echo it on the response.
pub async fn correlation(mut request: Request, next: Next) -> Response {
    let id = CorrelationId::from_header(
        request
            .headers()
            .get(CORRELATION_HEADER)
            .and_then(|v| v.to_str().ok()),
    );
    request.extensions_mut().insert(id.clone());

    let span = tracing::info_span!(
        "http_request",
        correlation_id = %id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(id.as_str()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(CORRELATION_HEADER), value);
    }
    response
}

/// A caller that presented a valid bearer token and carries the required claim.
///
/// Extracting this runs authentication (401) and then the authorization
/// gate (403). Handlers take it before the body, so neither the body nor the
/// dispatcher is touched for a rejected caller.
#[derive(Debug, Clone)]
pub struct Authorized(pub Principal);

impl FromRequestParts<AppState> for Authorized {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .map(|v| v.to_str().map_err(|_| Error::unauthenticated("authorization header is not ASCII")))
            .transpose()?;

        let principal = state.validator.authenticate(header)?;
        state.gate.authorize(principal.subject(), principal.claims())?;
        tracing::debug!(subject = principal.subject(), "caller authorized");
        Ok(Authorized(principal))
    }
}
