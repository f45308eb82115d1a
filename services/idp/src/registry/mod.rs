//! Client registry: point lookups of registered API consumers.
//!
//! The registry is read-only from the service's point of view. A miss is
//! `Ok(None)`; any failure to reach or understand the backing store is an
//! error and must never be reported as a miss.

pub mod cache;
pub mod http;
pub mod memory;

pub use cache::CachedClientRegistry;
pub use http::HttpClientRegistry;
pub use memory::InMemoryClientRegistry;

use async_trait::async_trait;
use rust_common::PlatformError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Lifecycle status of a client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    /// Client may obtain tokens
    #[default]
    Active,
    /// Client is blocked
    Disabled,
}

/// A registered API consumer.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    /// Unique, immutable client identifier
    pub client_id: String,
    /// Lower-case hex SHA-256 of the client secret
    pub client_secret_hash: String,
    /// Scopes the client may request
    #[serde(default)]
    pub allowed_scopes: BTreeSet<String>,
    /// Lifecycle status
    #[serde(default)]
    pub status: ClientStatus,
}

impl ClientRecord {
    /// Build an active record from a plaintext secret.
    #[must_use]
    pub fn new<I, S>(client_id: impl Into<String>, secret: &str, allowed_scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            client_id: client_id.into(),
            client_secret_hash: Self::hash_secret(secret),
            allowed_scopes: allowed_scopes.into_iter().map(Into::into).collect(),
            status: ClientStatus::Active,
        }
    }

    /// Return the record with a different status.
    #[must_use]
    pub fn with_status(mut self, status: ClientStatus) -> Self {
        self.status = status;
        self
    }

    /// Hash a plaintext secret into its stored form.
    #[must_use]
    pub fn hash_secret(secret: &str) -> String {
        hex::encode(Sha256::digest(secret.as_bytes()))
    }

    /// Compare a presented secret against the stored hash.
    ///
    /// Both sides are fixed-length digests compared with `subtle`, so the
    /// cost does not depend on where the first differing byte sits.
    #[must_use]
    pub fn verify_secret(&self, secret: &str) -> bool {
        let presented = Sha256::digest(secret.as_bytes());
        let Ok(stored) = hex::decode(&self.client_secret_hash) else {
            return false;
        };
        if stored.len() != presented.len() {
            return false;
        }
        presented.as_slice().ct_eq(&stored).into()
    }

    /// Whether the client may obtain tokens.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ClientStatus::Active
    }
}

impl fmt::Debug for ClientRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRecord")
            .field("client_id", &self.client_id)
            .field("client_secret_hash", &"[REDACTED]")
            .field("allowed_scopes", &self.allowed_scopes)
            .field("status", &self.status)
            .finish()
    }
}

/// Registry infrastructure failures.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Backing store unreachable or failing
    #[error("client registry unavailable: {0}")]
    Unavailable(String),

    /// Lookup exceeded its time budget
    #[error("client registry lookup timed out after {0:?}")]
    Timeout(Duration),

    /// Backing store answered with something that is not a client record
    #[error("client registry returned malformed data: {0}")]
    Malformed(String),
}

impl From<PlatformError> for RegistryError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::Timeout(after) => Self::Timeout(after),
            PlatformError::Serialization(e) => Self::Malformed(e.to_string()),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Point lookup of client records by identifier.
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    /// Exact-match lookup. `Ok(None)` means the client does not exist.
    async fn lookup(&self, client_id: &str) -> Result<Option<ClientRecord>, RegistryError>;
}

#[async_trait]
impl<R: ClientRegistry + ?Sized> ClientRegistry for Arc<R> {
    async fn lookup(&self, client_id: &str) -> Result<Option<ClientRecord>, RegistryError> {
        (**self).lookup(client_id).await
    }
}

/// Lookup bounded by a timeout; expiry surfaces as [`RegistryError::Timeout`].
///
/// # Errors
///
/// Propagates registry errors and converts an elapsed budget into a timeout.
pub async fn lookup_with_timeout(
    registry: &dyn ClientRegistry,
    client_id: &str,
    budget: Duration,
) -> Result<Option<ClientRecord>, RegistryError> {
    tokio::time::timeout(budget, registry.lookup(client_id))
        .await
        .map_err(|_| RegistryError::Timeout(budget))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_verification() {
        let record = ClientRecord::new("acme", "s3cr3t", ["read"]);
        assert!(record.verify_secret("s3cr3t"));
        assert!(!record.verify_secret("s3cr3T"));
        assert!(!record.verify_secret(""));
    }

    #[test]
    fn test_corrupt_hash_never_verifies() {
        let mut record = ClientRecord::new("acme", "s3cr3t", ["read"]);
        record.client_secret_hash = "not-hex".to_string();
        assert!(!record.verify_secret("s3cr3t"));
        record.client_secret_hash = "abcd".to_string();
        assert!(!record.verify_secret("s3cr3t"));
    }

    #[test]
    fn test_debug_redacts_hash() {
        let record = ClientRecord::new("acme", "s3cr3t", ["read"]);
        let rendered = format!("{record:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains(&record.client_secret_hash));
    }

    #[test]
    fn test_record_serde_shape() {
        let json = r#"{"clientId":"acme","clientSecretHash":"00","allowedScopes":["read"],"status":"disabled"}"#;
        let record: ClientRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.client_id, "acme");
        assert_eq!(record.status, ClientStatus::Disabled);
        assert!(!record.is_active());

        let minimal: ClientRecord =
            serde_json::from_str(r#"{"clientId":"x","clientSecretHash":"00"}"#).unwrap();
        assert!(minimal.is_active());
        assert!(minimal.allowed_scopes.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_timeout() {
        struct Stalled;

        #[async_trait]
        impl ClientRegistry for Stalled {
            async fn lookup(&self, _: &str) -> Result<Option<ClientRecord>, RegistryError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(None)
            }
        }

        let result = lookup_with_timeout(&Stalled, "acme", Duration::from_millis(10)).await;
        assert!(matches!(result, Err(RegistryError::Timeout(_))));
    }
}
