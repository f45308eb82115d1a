//! `POST /introspect`

use super::{AppState, parse_envelope};
use crate::error::IdpError;
use crate::introspection::Introspection;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct IntrospectionRequest {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Serialize)]
struct ActiveClaims {
    sub: String,
    client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    iat: i64,
    exp: i64,
    jti: String,
    iss: String,
    token_type: &'static str,
}

#[derive(Serialize)]
struct IntrospectionResponse {
    active: bool,
    #[serde(flatten)]
    claims: Option<ActiveClaims>,
}

impl From<Introspection> for IntrospectionResponse {
    fn from(result: Introspection) -> Self {
        let claims = result.claims.filter(|_| result.active).map(|c| ActiveClaims {
            scope: c.scope_string(),
            client_id: c.subject.clone(),
            sub: c.subject,
            iat: c.issued_at,
            exp: c.expires_at,
            jti: c.token_id,
            iss: c.issuer,
            token_type: "bearer",
        });
        Self {
            active: claims.is_some(),
            claims,
        }
    }
}

pub(super) async fn introspect_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, IdpError> {
    let request: IntrospectionRequest = parse_envelope(&headers, &body)?;
    let token = request
        .token
        .ok_or_else(|| IdpError::invalid_request("missing token"))?;

    let result = state.introspection.introspect(&token).await?;

    let mut response = Json(IntrospectionResponse::from(result)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(response)
}
