//! Token introspection.
//!
//! Anything that does not parse, fails its tag check or has expired is
//! reported inactive. Only collaborator failures and tokens that carry a
//! valid tag but an undecodable payload are errors.

use crate::clock::Clock;
use crate::error::IdpError;
use crate::metrics;
use crate::oracle::MacOracle;
use crate::registry::{ClientRegistry, lookup_with_timeout};
use crate::token::{self, TokenClaims};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Outcome of introspecting a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Introspection {
    /// Whether the token is currently valid
    pub active: bool,
    /// Claims, present only for active tokens
    pub claims: Option<TokenClaims>,
}

impl Introspection {
    /// The inactive answer.
    #[must_use]
    pub const fn inactive() -> Self {
        Self {
            active: false,
            claims: None,
        }
    }

    /// An active answer carrying `claims`.
    #[must_use]
    pub const fn active(claims: TokenClaims) -> Self {
        Self {
            active: true,
            claims: Some(claims),
        }
    }
}

/// Verifies tokens via the oracle and reports their state.
pub struct IntrospectionEngine {
    oracle: Arc<dyn MacOracle>,
    clock: Arc<dyn Clock>,
    client_check: Option<ClientCheck>,
}

/// Registry consulted to deactivate tokens of disabled or removed clients.
struct ClientCheck {
    registry: Arc<dyn ClientRegistry>,
    timeout: Duration,
}

impl IntrospectionEngine {
    /// Engine that trusts any unexpired token with a valid tag.
    #[must_use]
    pub fn new(oracle: Arc<dyn MacOracle>, clock: Arc<dyn Clock>) -> Self {
        Self {
            oracle,
            clock,
            client_check: None,
        }
    }

    /// Also require the token's client to still exist and be active.
    #[must_use]
    pub fn with_client_check(mut self, registry: Arc<dyn ClientRegistry>, timeout: Duration) -> Self {
        self.client_check = Some(ClientCheck { registry, timeout });
        self
    }

    /// Introspect a wire token.
    ///
    /// # Errors
    ///
    /// - [`IdpError::InfrastructureUnavailable`] when the oracle (or, with the
    ///   client check enabled, the registry) fails
    /// - [`IdpError::InternalInvariantViolation`] when a token with a valid tag
    ///   does not decode
    #[instrument(skip_all)]
    pub async fn introspect(&self, wire: &str) -> Result<Introspection, IdpError> {
        let result = self.introspect_inner(wire).await;
        metrics::record_introspection(match &result {
            Ok(i) if i.active => "active",
            Ok(_) => "inactive",
            Err(IdpError::InfrastructureUnavailable { .. }) => "unavailable",
            Err(_) => "error",
        });
        result
    }

    async fn introspect_inner(&self, wire: &str) -> Result<Introspection, IdpError> {
        let Ok(token) = token::from_wire_string(wire) else {
            debug!("token does not parse");
            return Ok(Introspection::inactive());
        };

        if !self.oracle.verify_mac(&token.signing_input(), &token.tag).await? {
            debug!("token tag rejected");
            return Ok(Introspection::inactive());
        }

        let claims = token::decode(&token.payload)
            .map_err(|e| IdpError::invariant(format!("verified token failed to decode: {e}")))?;

        if claims.is_expired_at(self.clock.unix_now()) {
            debug!(jti = %claims.token_id, "token expired");
            return Ok(Introspection::inactive());
        }

        if let Some(check) = &self.client_check {
            let record =
                lookup_with_timeout(check.registry.as_ref(), &claims.subject, check.timeout).await?;
            if !record.is_some_and(|r| r.is_active()) {
                debug!(sub = %claims.subject, "token client no longer active");
                return Ok(Introspection::inactive());
            }
        }

        Ok(Introspection::active(claims))
    }
}
