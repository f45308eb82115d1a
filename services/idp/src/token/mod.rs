//! Token claims, canonical codec and wire form.

mod claims;
pub mod codec;

pub use claims::{TokenClaims, is_valid_scope_token};
pub use codec::{decode, encode, from_wire_string, to_wire_string};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use thiserror::Error;

/// Token codec failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Bytes are not a canonical token or claims set
    #[error("malformed token: {0}")]
    Malformed(String),
}

impl CodecError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

/// Canonical payload plus the oracle's tag over its signing input.
///
/// Equality is byte equality; authenticity is only ever established by
/// asking the oracle to verify the tag.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Canonical claims JSON
    pub payload: Vec<u8>,
    /// MAC over [`IssuedToken::signing_input`]
    pub tag: Vec<u8>,
}

impl IssuedToken {
    /// Bytes the tag is computed over: `header.payload` in wire encoding.
    #[must_use]
    pub fn signing_input(&self) -> Vec<u8> {
        self.signing_input_string().into_bytes()
    }

    fn signing_input_string(&self) -> String {
        let mut input = String::with_capacity(
            codec::HEADER_SEGMENT.len() + 1 + self.payload.len().div_ceil(3) * 4,
        );
        input.push_str(codec::HEADER_SEGMENT);
        input.push('.');
        URL_SAFE_NO_PAD.encode_string(&self.payload, &mut input);
        input
    }
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("payload_len", &self.payload.len())
            .field("tag", &"[REDACTED]")
            .finish()
    }
}
