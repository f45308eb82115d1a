//! `POST /token`

use super::{AppState, parse_envelope};
use crate::error::IdpError;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

const CLIENT_CREDENTIALS: &str = "client_credentials";

#[derive(Deserialize, Default)]
struct TokenRequest {
    #[serde(default, alias = "grantType")]
    grant_type: Option<String>,
    #[serde(default, alias = "clientId")]
    client_id: Option<String>,
    #[serde(default, alias = "clientSecret")]
    client_secret: Option<String>,
    #[serde(default)]
    scopes: Option<Vec<String>>,
    #[serde(default)]
    scope: Option<String>,
}

impl fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRequest")
            .field("grant_type", &self.grant_type)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("scopes", &self.scopes)
            .field("scope", &self.scope)
            .finish()
    }
}

impl TokenRequest {
    /// `scopes` list or space-delimited `scope`; `None` when neither is given.
    fn requested_scopes(&self) -> Result<Option<Vec<String>>, IdpError> {
        match (&self.scopes, &self.scope) {
            (Some(_), Some(_)) => Err(IdpError::invalid_request("both scope and scopes given")),
            (Some(list), None) => Ok(Some(list.clone())),
            (None, Some(s)) if s.is_empty() => Ok(Some(Vec::new())),
            (None, Some(s)) => Ok(Some(s.split(' ').map(str::to_string).collect())),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
    expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
}

struct Credentials {
    client_id: String,
    client_secret: Zeroizing<String>,
}

pub(super) async fn issue_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, IdpError> {
    let request: TokenRequest = parse_envelope(&headers, &body)?;

    if request
        .grant_type
        .as_deref()
        .is_some_and(|g| g != CLIENT_CREDENTIALS)
    {
        return Err(IdpError::UnsupportedGrantType);
    }
    let scopes = request.requested_scopes()?;
    let credentials = credentials(&headers, request.client_id, request.client_secret)?;

    let grant = state
        .issuance
        .issue(
            &credentials.client_id,
            &credentials.client_secret,
            scopes.as_deref(),
        )
        .await?;

    let body = TokenResponse {
        access_token: grant.access_token(),
        token_type: "bearer",
        expires_in: grant.expires_in(),
        scope: grant.claims.scope_string(),
    };
    let mut response = Json(body).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    Ok(response)
}

/// Body credentials or HTTP Basic, never both.
fn credentials(
    headers: &HeaderMap,
    client_id: Option<String>,
    client_secret: Option<String>,
) -> Result<Credentials, IdpError> {
    let basic = headers.get(header::AUTHORIZATION);
    match (client_id, basic) {
        (Some(_), Some(_)) => Err(IdpError::invalid_request(
            "multiple client authentication methods",
        )),
        (Some(client_id), None) => Ok(Credentials {
            client_id,
            client_secret: Zeroizing::new(client_secret.unwrap_or_default()),
        }),
        (None, Some(value)) => {
            if client_secret.is_some() {
                return Err(IdpError::invalid_request(
                    "multiple client authentication methods",
                ));
            }
            parse_basic(value.to_str().map_err(|_| IdpError::AuthFailed)?)
        }
        (None, None) => Err(IdpError::AuthFailed),
    }
}

/// RFC 6749 §2.3.1: `Basic base64(urlencode(id) ":" urlencode(secret))`.
fn parse_basic(value: &str) -> Result<Credentials, IdpError> {
    let (scheme, encoded) = value.trim().split_once(' ').ok_or(IdpError::AuthFailed)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(IdpError::AuthFailed);
    }
    let decoded = Zeroizing::new(
        STANDARD
            .decode(encoded.trim())
            .map_err(|_| IdpError::AuthFailed)?,
    );
    let decoded = std::str::from_utf8(&decoded).map_err(|_| IdpError::AuthFailed)?;
    let (id, secret) = decoded.split_once(':').ok_or(IdpError::AuthFailed)?;
    Ok(Credentials {
        client_id: form_decode(id),
        client_secret: Zeroizing::new(form_decode(secret)),
    })
}

/// Percent-decode with `+` as space. A literal `&` is kept as data.
fn form_decode(raw: &str) -> String {
    let escaped = raw.replace('&', "%26");
    url::form_urlencoded::parse(format!("v={escaped}").as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}
