use super::CodecError;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// `iss`
    pub issuer: String,
    /// `sub`, the client id
    pub subject: String,
    /// `iat`, unix seconds
    pub issued_at: i64,
    /// `exp`, unix seconds
    pub expires_at: i64,
    /// Granted scopes, in grant order
    pub scopes: Vec<String>,
    /// `jti`
    pub token_id: String,
}

impl TokenClaims {
    /// Space-delimited scope string, or `None` when no scopes were granted.
    #[must_use]
    pub fn scope_string(&self) -> Option<String> {
        (!self.scopes.is_empty()).then(|| self.scopes.join(" "))
    }

    /// Whether the token has expired at `now` (unix seconds).
    #[must_use]
    pub const fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    /// Seconds of lifetime granted at issuance.
    #[must_use]
    pub const fn lifetime_secs(&self) -> i64 {
        self.expires_at - self.issued_at
    }

    /// Check structural invariants.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Malformed`] naming the first violated invariant.
    pub fn validate(&self) -> Result<(), CodecError> {
        if self.issuer.is_empty() {
            return Err(CodecError::malformed("empty issuer"));
        }
        if self.subject.is_empty() {
            return Err(CodecError::malformed("empty subject"));
        }
        if self.token_id.is_empty() {
            return Err(CodecError::malformed("empty token id"));
        }
        if self.expires_at <= self.issued_at {
            return Err(CodecError::malformed("exp must be after iat"));
        }
        for (i, scope) in self.scopes.iter().enumerate() {
            if !is_valid_scope_token(scope) {
                return Err(CodecError::malformed("invalid scope token"));
            }
            if self.scopes[..i].contains(scope) {
                return Err(CodecError::malformed("duplicate scope"));
            }
        }
        Ok(())
    }
}

/// RFC 6749 §3.3 `scope-token = 1*( %x21 / %x23-5B / %x5D-7E )`.
#[must_use]
pub fn is_valid_scope_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .bytes()
            .all(|b| matches!(b, 0x21 | 0x23..=0x5B | 0x5D..=0x7E))
}
