//! In-process HMAC-SHA256 oracle for local mode and tests.

use super::{MacOracle, OracleError};
use async_trait::async_trait;
use ring::hmac;
use std::fmt;
use zeroize::Zeroizing;

/// Shortest key accepted, in bytes.
pub const MIN_KEY_LEN: usize = 32;

/// HMAC-SHA256 with a key held in process memory.
pub struct LocalHmacOracle {
    key: hmac::Key,
}

impl LocalHmacOracle {
    /// Build from raw key bytes. The caller's copy is zeroized on drop.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Rejected`] for keys shorter than [`MIN_KEY_LEN`].
    pub fn new(secret: Zeroizing<Vec<u8>>) -> Result<Self, OracleError> {
        if secret.len() < MIN_KEY_LEN {
            return Err(OracleError::Rejected(format!(
                "local mac key must be at least {MIN_KEY_LEN} bytes"
            )));
        }
        Ok(Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, &secret),
        })
    }
}

impl fmt::Debug for LocalHmacOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalHmacOracle").finish_non_exhaustive()
    }
}

#[async_trait]
impl MacOracle for LocalHmacOracle {
    async fn generate_mac(&self, message: &[u8]) -> Result<Vec<u8>, OracleError> {
        Ok(hmac::sign(&self.key, message).as_ref().to_vec())
    }

    async fn verify_mac(&self, message: &[u8], tag: &[u8]) -> Result<bool, OracleError> {
        Ok(hmac::verify(&self.key, message, tag).is_ok())
    }
}
