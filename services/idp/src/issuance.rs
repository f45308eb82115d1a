//! Client-credentials token issuance.
//!
//! Authenticate the client against the registry, check the requested
//! scopes against its grant, build claims, then ask the oracle for a tag.
//! The registry lookup always completes before any oracle call and nothing
//! is stored.

use crate::clock::Clock;
use crate::error::IdpError;
use crate::metrics;
use crate::oracle::MacOracle;
use crate::registry::{ClientRecord, ClientRegistry, lookup_with_timeout};
use crate::token::{self, IssuedToken, TokenClaims, is_valid_scope_token};
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

// Compared against when the client id is unknown, so a miss costs the same
// hash work as a wrong secret.
static UNKNOWN_CLIENT: Lazy<ClientRecord> =
    Lazy::new(|| ClientRecord::new("", "unknown-client-placeholder", Vec::<String>::new()));

/// Issuance settings.
#[derive(Debug, Clone)]
pub struct IssuanceSettings {
    /// `iss` claim
    pub issuer: String,
    /// Token lifetime
    pub token_ttl: Duration,
    /// Registry lookup budget
    pub registry_timeout: Duration,
}

impl Default for IssuanceSettings {
    fn default() -> Self {
        Self {
            issuer: "open-idp".to_string(),
            token_ttl: Duration::from_secs(3600),
            registry_timeout: Duration::from_secs(2),
        }
    }
}

/// A freshly issued token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct Grant {
    /// Signed token
    pub token: IssuedToken,
    /// Claims encoded in the token
    pub claims: TokenClaims,
}

impl Grant {
    /// Compact wire form handed to the client.
    #[must_use]
    pub fn access_token(&self) -> String {
        token::to_wire_string(&self.token)
    }

    /// Seconds until expiry, as of issuance.
    #[must_use]
    pub const fn expires_in(&self) -> i64 {
        self.claims.lifetime_secs()
    }
}

/// Issues tokens for registered clients.
pub struct IssuanceEngine {
    registry: Arc<dyn ClientRegistry>,
    oracle: Arc<dyn MacOracle>,
    clock: Arc<dyn Clock>,
    settings: IssuanceSettings,
}

impl IssuanceEngine {
    /// Create an engine.
    #[must_use]
    pub fn new(
        registry: Arc<dyn ClientRegistry>,
        oracle: Arc<dyn MacOracle>,
        clock: Arc<dyn Clock>,
        settings: IssuanceSettings,
    ) -> Self {
        Self {
            registry,
            oracle,
            clock,
            settings,
        }
    }

    /// Issue a token for `client_id`.
    ///
    /// `requested_scopes` of `None` grants every scope the client holds;
    /// `Some(&[])` grants none.
    ///
    /// # Errors
    ///
    /// - [`IdpError::AuthFailed`] for an unknown or disabled client or a wrong secret
    /// - [`IdpError::InvalidRequest`] for a syntactically invalid scope
    /// - [`IdpError::ScopeDenied`] when any scope exceeds the grant
    /// - [`IdpError::InfrastructureUnavailable`] when the registry or oracle fails
    #[instrument(skip(self, client_secret, requested_scopes))]
    pub async fn issue(
        &self,
        client_id: &str,
        client_secret: &str,
        requested_scopes: Option<&[String]>,
    ) -> Result<Grant, IdpError> {
        let result = self.issue_inner(client_id, client_secret, requested_scopes).await;
        metrics::record_issuance(match &result {
            Ok(_) => "issued",
            Err(IdpError::AuthFailed) => "auth_failed",
            Err(IdpError::ScopeDenied) => "scope_denied",
            Err(IdpError::InvalidRequest(_) | IdpError::UnsupportedGrantType) => "invalid_request",
            Err(IdpError::InfrastructureUnavailable { .. }) => "unavailable",
            Err(_) => "error",
        });
        result
    }

    async fn issue_inner(
        &self,
        client_id: &str,
        client_secret: &str,
        requested_scopes: Option<&[String]>,
    ) -> Result<Grant, IdpError> {
        let record = self.authenticate(client_id, client_secret).await?;
        let scopes = grant_scopes(&record, requested_scopes)?;

        let issued_at = self.clock.unix_now();
        let ttl = i64::try_from(self.settings.token_ttl.as_secs())
            .map_err(|_| IdpError::invariant("token ttl out of range"))?;
        let claims = TokenClaims {
            issuer: self.settings.issuer.clone(),
            subject: record.client_id,
            issued_at,
            expires_at: issued_at.saturating_add(ttl),
            scopes,
            token_id: Uuid::new_v4().to_string(),
        };

        let payload =
            token::encode(&claims).map_err(|e| IdpError::invariant(format!("encode: {e}")))?;
        match token::decode(&payload) {
            Ok(decoded) if decoded == claims => {}
            Ok(_) => return Err(IdpError::invariant("payload round trip changed claims")),
            Err(e) => return Err(IdpError::invariant(format!("payload round trip: {e}"))),
        }

        let mut token = IssuedToken {
            payload,
            tag: Vec::new(),
        };
        token.tag = self.oracle.generate_mac(&token.signing_input()).await?;

        info!(
            jti = %claims.token_id,
            scope = claims.scope_string().as_deref().unwrap_or(""),
            exp = claims.expires_at,
            "token issued"
        );
        Ok(Grant { token, claims })
    }

    async fn authenticate(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<ClientRecord, IdpError> {
        let found =
            lookup_with_timeout(self.registry.as_ref(), client_id, self.settings.registry_timeout)
                .await?;

        let Some(record) = found else {
            let _ = UNKNOWN_CLIENT.verify_secret(client_secret);
            debug!("unknown client");
            return Err(IdpError::AuthFailed);
        };

        let secret_ok = record.verify_secret(client_secret);
        if !secret_ok || !record.is_active() {
            debug!(secret_ok, active = record.is_active(), "client authentication failed");
            return Err(IdpError::AuthFailed);
        }
        Ok(record)
    }
}

/// Resolve the scopes to grant. Never narrows silently.
fn grant_scopes(
    record: &ClientRecord,
    requested: Option<&[String]>,
) -> Result<Vec<String>, IdpError> {
    let Some(requested) = requested else {
        return Ok(record.allowed_scopes.iter().cloned().collect());
    };

    let mut granted: Vec<String> = Vec::with_capacity(requested.len());
    for scope in requested {
        if !is_valid_scope_token(scope) {
            return Err(IdpError::invalid_request("invalid scope token"));
        }
        if granted.contains(scope) {
            continue;
        }
        if !record.allowed_scopes.contains(scope) {
            return Err(IdpError::ScopeDenied);
        }
        granted.push(scope.clone());
    }
    Ok(granted)
}
