//! Service error taxonomy and its HTTP rendering.
//!
//! Domain failures (bad credentials, over-asked scopes, malformed envelopes)
//! are kept apart from infrastructure failures at every layer so the router
//! can pick the right status and tell callers whether retrying is safe.
//! Responses carry a stable error code only; diagnostics go to the log.

use crate::oracle::OracleError;
use crate::registry::RegistryError;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Seconds suggested to callers before retrying a 503.
const RETRY_AFTER_SECS: &str = "1";

/// Errors surfaced by the issuance and introspection engines.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum IdpError {
    /// Unknown client, disabled client or wrong secret. Deliberately carries
    /// no detail about which check failed.
    #[error("client authentication failed")]
    AuthFailed,

    /// Requested scopes exceed the client's grant
    #[error("requested scope exceeds client grant")]
    ScopeDenied,

    /// Request envelope could not be understood
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Grant type other than `client_credentials`
    #[error("unsupported grant type")]
    UnsupportedGrantType,

    /// Registry or MAC oracle could not answer in time
    #[error("{service} unavailable: {reason}")]
    InfrastructureUnavailable {
        /// Which collaborator failed
        service: &'static str,
        /// Diagnostic detail, logged but never returned to callers
        reason: String,
    },

    /// A token this service signed failed canonical decoding, or a freshly
    /// encoded payload did not survive its own round trip
    #[error("internal invariant violated: {0}")]
    InternalInvariantViolation(String),
}

impl IdpError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::AuthFailed => ErrorCode::InvalidClient,
            Self::ScopeDenied => ErrorCode::InvalidScope,
            Self::InvalidRequest(_) => ErrorCode::InvalidRequest,
            Self::UnsupportedGrantType => ErrorCode::UnsupportedGrantType,
            Self::InfrastructureUnavailable { .. } => ErrorCode::TemporarilyUnavailable,
            Self::InternalInvariantViolation(_) => ErrorCode::ServerError,
        }
    }

    /// Whether the caller may safely repeat the request.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::InfrastructureUnavailable { .. })
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create an invariant violation error.
    #[must_use]
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InternalInvariantViolation(msg.into())
    }
}

impl From<RegistryError> for IdpError {
    fn from(err: RegistryError) -> Self {
        Self::InfrastructureUnavailable {
            service: "client-registry",
            reason: err.to_string(),
        }
    }
}

impl From<OracleError> for IdpError {
    fn from(err: OracleError) -> Self {
        Self::InfrastructureUnavailable {
            service: "mac-oracle",
            reason: err.to_string(),
        }
    }
}

/// Error codes returned in response bodies (RFC 6749 §5.2 vocabulary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Client authentication failed
    InvalidClient,
    /// Requested scope is invalid or exceeds the grant
    InvalidScope,
    /// Malformed request
    InvalidRequest,
    /// Grant type not supported
    UnsupportedGrantType,
    /// Collaborator unavailable; retry later
    TemporarilyUnavailable,
    /// Unexpected server-side failure
    ServerError,
}

impl ErrorCode {
    /// String form used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidClient => "invalid_client",
            Self::InvalidScope => "invalid_scope",
            Self::InvalidRequest => "invalid_request",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::TemporarilyUnavailable => "temporarily_unavailable",
            Self::ServerError => "server_error",
        }
    }

    /// HTTP status for this code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidClient => StatusCode::UNAUTHORIZED,
            Self::InvalidScope | Self::InvalidRequest | Self::UnsupportedGrantType => {
                StatusCode::BAD_REQUEST
            }
            Self::TemporarilyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for IdpError {
    fn into_response(self) -> Response {
        let code = self.code();
        match &self {
            Self::InfrastructureUnavailable { service, reason } => {
                warn!(service = *service, reason = %reason, "dependency unavailable");
            }
            Self::InternalInvariantViolation(detail) => {
                error!(detail = %detail, "internal invariant violated");
            }
            other => warn!(error = %other, code = code.as_str(), "request rejected"),
        }

        let mut response = (code.status(), Json(json!({ "error": code.as_str() }))).into_response();
        let headers = response.headers_mut();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        match code {
            ErrorCode::InvalidClient => {
                headers.insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Basic realm=\"token\""),
                );
            }
            ErrorCode::TemporarilyUnavailable => {
                headers.insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
            }
            _ => {}
        }
        response
    }
}
