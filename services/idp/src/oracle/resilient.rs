//! Timeout and bounded retry around any oracle.

use super::{MacOracle, OracleError};
use crate::metrics;
use async_trait::async_trait;
use rust_common::RetryPolicy;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Applies a per-attempt deadline and retries transient failures.
///
/// Both oracle operations are idempotent, so repeating them is safe.
/// Definitive answers (including `Ok(false)` from verify) are never retried.
#[derive(Debug)]
pub struct ResilientMacOracle<O> {
    inner: O,
    attempt_timeout: Duration,
    retry: RetryPolicy,
}

impl<O: MacOracle> ResilientMacOracle<O> {
    /// Wrap `inner`.
    #[must_use]
    pub const fn new(inner: O, attempt_timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            inner,
            attempt_timeout,
            retry,
        }
    }

    async fn attempt<T, F>(&self, operation: &'static str, call: F) -> Result<T, OracleError>
    where
        F: Future<Output = Result<T, OracleError>>,
    {
        let outcome = tokio::time::timeout(self.attempt_timeout, call)
            .await
            .unwrap_or(Err(OracleError::Timeout(self.attempt_timeout)));
        match &outcome {
            Ok(_) => metrics::record_oracle_call(operation, "ok"),
            Err(e) => {
                warn!(operation, error = %e, "mac oracle call failed");
                metrics::record_oracle_call(operation, e.kind());
            }
        }
        outcome
    }
}

#[async_trait]
impl<O: MacOracle> MacOracle for ResilientMacOracle<O> {
    async fn generate_mac(&self, message: &[u8]) -> Result<Vec<u8>, OracleError> {
        self.retry
            .execute(|| self.attempt("generate", self.inner.generate_mac(message)))
            .await
    }

    async fn verify_mac(&self, message: &[u8], tag: &[u8]) -> Result<bool, OracleError> {
        self.retry
            .execute(|| self.attempt("verify", self.inner.verify_mac(message, tag)))
            .await
    }
}
