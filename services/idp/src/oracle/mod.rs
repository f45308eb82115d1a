//! MAC oracle: the only holder of signing key material.
//!
//! The service never sees the key. It asks the oracle to MAC a message or
//! to verify a tag, and both operations are idempotent. A tag mismatch is a
//! definitive `Ok(false)`, never an error.

pub mod http;
pub mod local;
pub mod resilient;

pub use http::HttpMacOracle;
pub use local::LocalHmacOracle;
pub use resilient::ResilientMacOracle;

use async_trait::async_trait;
use rust_common::{PlatformError, Retryable};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Oracle failures. None of these mean "the tag is wrong".
#[derive(Error, Debug)]
pub enum OracleError {
    /// Oracle unreachable, overloaded or failing
    #[error("mac oracle unavailable: {0}")]
    Unavailable(String),

    /// Call exceeded its time budget
    #[error("mac oracle call timed out after {0:?}")]
    Timeout(Duration),

    /// Oracle refused the request (bad key id, permissions)
    #[error("mac oracle rejected request: {0}")]
    Rejected(String),

    /// Oracle answered with a body we could not interpret
    #[error("mac oracle returned malformed response: {0}")]
    Malformed(String),
}

impl OracleError {
    /// Whether repeating the same call may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }

    /// Short label for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::Timeout(_) => "timeout",
            Self::Rejected(_) => "rejected",
            Self::Malformed(_) => "malformed",
        }
    }
}

impl Retryable for OracleError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

impl From<PlatformError> for OracleError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::Timeout(after) => Self::Timeout(after),
            PlatformError::InvalidInput(msg) | PlatformError::NotFound(msg) => Self::Rejected(msg),
            PlatformError::Serialization(e) => Self::Malformed(e.to_string()),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Keyed MAC generation and verification.
#[async_trait]
pub trait MacOracle: Send + Sync {
    /// MAC `message` under the service key.
    async fn generate_mac(&self, message: &[u8]) -> Result<Vec<u8>, OracleError>;

    /// Check `tag` against `message`. `Ok(false)` on mismatch.
    async fn verify_mac(&self, message: &[u8], tag: &[u8]) -> Result<bool, OracleError>;
}

#[async_trait]
impl<O: MacOracle + ?Sized> MacOracle for Arc<O> {
    async fn generate_mac(&self, message: &[u8]) -> Result<Vec<u8>, OracleError> {
        (**self).generate_mac(message).await
    }

    async fn verify_mac(&self, message: &[u8], tag: &[u8]) -> Result<bool, OracleError> {
        (**self).verify_mac(message, tag).await
    }
}
