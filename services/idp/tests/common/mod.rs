//! Shared fixtures for integration tests.

#![allow(dead_code)]

use idp_service::clock::FixedClock;
use idp_service::introspection::IntrospectionEngine;
use idp_service::issuance::{IssuanceEngine, IssuanceSettings};
use idp_service::oracle::{LocalHmacOracle, MacOracle};
use idp_service::registry::{ClientRecord, ClientRegistry, ClientStatus, InMemoryClientRegistry};
use std::sync::Arc;
use std::time::Duration;
use zeroize::Zeroizing;

/// Key held by the local oracle in every fixture.
pub const MAC_KEY: [u8; 32] = [0x42; 32];

/// Fixed "now" for deterministic expiry.
pub const NOW: i64 = 1_700_000_000;

/// Token lifetime used by fixtures.
pub const TTL_SECS: i64 = 3600;

pub fn scopes(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

pub fn records() -> Vec<ClientRecord> {
    vec![
        ClientRecord::new("acme", "s3cr3t", ["read"]),
        ClientRecord::new("widgets", "w1dg3ts", ["read", "write", "admin"]),
        ClientRecord::new("retired", "old-secret", ["read"]).with_status(ClientStatus::Disabled),
    ]
}

pub fn registry() -> Arc<InMemoryClientRegistry> {
    Arc::new(InMemoryClientRegistry::new(records()).unwrap())
}

pub fn oracle() -> Arc<LocalHmacOracle> {
    Arc::new(LocalHmacOracle::new(Zeroizing::new(MAC_KEY.to_vec())).unwrap())
}

pub fn settings() -> IssuanceSettings {
    IssuanceSettings {
        issuer: "open-idp".to_string(),
        token_ttl: Duration::from_secs(TTL_SECS as u64),
        registry_timeout: Duration::from_secs(1),
    }
}

/// Engines sharing one registry, oracle and clock.
pub struct Fixture {
    pub clock: Arc<FixedClock>,
    pub registry: Arc<dyn ClientRegistry>,
    pub oracle: Arc<dyn MacOracle>,
    pub issuance: IssuanceEngine,
    pub introspection: IntrospectionEngine,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with(registry(), oracle())
    }

    pub fn with(registry: Arc<dyn ClientRegistry>, oracle: Arc<dyn MacOracle>) -> Self {
        let clock = Arc::new(FixedClock::at(NOW));
        let issuance = IssuanceEngine::new(
            Arc::clone(&registry),
            Arc::clone(&oracle),
            clock.clone(),
            settings(),
        );
        let introspection = IntrospectionEngine::new(Arc::clone(&oracle), clock.clone());
        Self {
            clock,
            registry,
            oracle,
            issuance,
            introspection,
        }
    }

    /// Introspection engine that also checks the client is still active.
    pub fn checking_introspection(&self, registry: Arc<dyn ClientRegistry>) -> IntrospectionEngine {
        IntrospectionEngine::new(Arc::clone(&self.oracle), self.clock.clone())
            .with_client_check(registry, Duration::from_secs(1))
    }
}
