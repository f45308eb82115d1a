//! Introspection engine behavior.

mod common;

use async_trait::async_trait;
use common::{Fixture, NOW, TTL_SECS, scopes};
use idp_service::IdpError;
use idp_service::introspection::Introspection;
use idp_service::oracle::{MacOracle, OracleError};
use idp_service::registry::{ClientRecord, ClientStatus, InMemoryClientRegistry};
use idp_service::token::{self, IssuedToken};
use std::sync::Arc;

#[tokio::test]
async fn test_fresh_token_is_active() {
    let fx = Fixture::new();
    let grant = fx.issuance.issue("acme", "s3cr3t", None).await.unwrap();

    let result = fx.introspection.introspect(&grant.access_token()).await.unwrap();
    assert_eq!(result, Introspection::active(grant.claims));
}

#[tokio::test]
async fn test_introspection_is_idempotent() {
    let fx = Fixture::new();
    let wire = fx.issuance.issue("acme", "s3cr3t", None).await.unwrap().access_token();

    let first = fx.introspection.introspect(&wire).await.unwrap();
    let second = fx.introspection.introspect(&wire).await.unwrap();
    assert!(first.active);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_expiry_boundary() {
    let fx = Fixture::new();
    let wire = fx.issuance.issue("acme", "s3cr3t", None).await.unwrap().access_token();

    fx.clock.set(NOW + TTL_SECS - 1);
    assert!(fx.introspection.introspect(&wire).await.unwrap().active);

    fx.clock.set(NOW + TTL_SECS);
    assert!(!fx.introspection.introspect(&wire).await.unwrap().active);

    fx.clock.set(NOW + TTL_SECS + 1);
    assert_eq!(
        fx.introspection.introspect(&wire).await.unwrap(),
        Introspection::inactive()
    );
}

#[tokio::test]
async fn test_garbage_is_inactive_not_error() {
    let fx = Fixture::new();
    for wire in ["not-a-token", "", "a.b.c", "....", "x".repeat(10_000).as_str()] {
        assert_eq!(
            fx.introspection.introspect(wire).await.unwrap(),
            Introspection::inactive(),
            "{wire:?}"
        );
    }
}

#[tokio::test]
async fn test_tampered_payload_is_inactive() {
    let fx = Fixture::new();
    let grant = fx
        .issuance
        .issue("acme", "s3cr3t", Some(&scopes(&["read"])))
        .await
        .unwrap();

    let mut forged_claims = grant.claims.clone();
    forged_claims.scopes = scopes(&["admin"]);
    let forged = IssuedToken {
        payload: token::encode(&forged_claims).unwrap(),
        tag: grant.token.tag.clone(),
    };
    assert!(!fx
        .introspection
        .introspect(&token::to_wire_string(&forged))
        .await
        .unwrap()
        .active);
}

#[tokio::test]
async fn test_foreign_key_is_inactive() {
    let fx = Fixture::new();
    let wire = fx.issuance.issue("acme", "s3cr3t", None).await.unwrap().access_token();

    let other = Fixture::with(
        common::registry(),
        Arc::new(
            idp_service::oracle::LocalHmacOracle::new(zeroize::Zeroizing::new(vec![0x11; 32]))
                .unwrap(),
        ),
    );
    assert!(!other.introspection.introspect(&wire).await.unwrap().active);
}

#[tokio::test]
async fn test_validly_tagged_garbage_payload_is_invariant_violation() {
    let fx = Fixture::new();
    let mut bogus = IssuedToken {
        payload: br#"{"iss": "open-idp"}"#.to_vec(),
        tag: Vec::new(),
    };
    bogus.tag = fx.oracle.generate_mac(&bogus.signing_input()).await.unwrap();

    let result = fx.introspection.introspect(&token::to_wire_string(&bogus)).await;
    assert!(matches!(result, Err(IdpError::InternalInvariantViolation(_))));
}

struct DownOracle;

#[async_trait]
impl MacOracle for DownOracle {
    async fn generate_mac(&self, _: &[u8]) -> Result<Vec<u8>, OracleError> {
        Err(OracleError::Unavailable("down".into()))
    }

    async fn verify_mac(&self, _: &[u8], _: &[u8]) -> Result<bool, OracleError> {
        Err(OracleError::Timeout(std::time::Duration::from_secs(2)))
    }
}

#[tokio::test]
async fn test_oracle_outage_is_unavailable_not_inactive() {
    let fx = Fixture::new();
    let wire = fx.issuance.issue("acme", "s3cr3t", None).await.unwrap().access_token();

    let down = Fixture::with(common::registry(), Arc::new(DownOracle));
    let result = down.introspection.introspect(&wire).await;
    assert!(matches!(
        result,
        Err(IdpError::InfrastructureUnavailable { .. })
    ));
}

#[tokio::test]
async fn test_client_check_deactivates_disabled_clients() {
    let fx = Fixture::new();
    let wire = fx.issuance.issue("acme", "s3cr3t", None).await.unwrap().access_token();

    let still_active = fx.checking_introspection(common::registry());
    assert!(still_active.introspect(&wire).await.unwrap().active);

    let disabled = InMemoryClientRegistry::new([
        ClientRecord::new("acme", "s3cr3t", ["read"]).with_status(ClientStatus::Disabled),
    ])
    .unwrap();
    let checking = fx.checking_introspection(Arc::new(disabled));
    assert!(!checking.introspect(&wire).await.unwrap().active);

    let removed = InMemoryClientRegistry::new(Vec::<ClientRecord>::new()).unwrap();
    let checking = fx.checking_introspection(Arc::new(removed));
    assert!(!checking.introspect(&wire).await.unwrap().active);

    // Without the check the same token stays active.
    assert!(fx.introspection.introspect(&wire).await.unwrap().active);
}
