//! Prometheus metrics for the identity provider.

use once_cell::sync::Lazy;
use prometheus::{CounterVec, Encoder, TextEncoder, register_counter_vec};

/// Token issuance attempts by outcome.
pub static TOKENS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "idp_tokens_issued_total",
        "Total number of token issuance attempts",
        &["outcome"]
    )
    .expect("Failed to register tokens_issued metric")
});

/// Introspections by result.
pub static INTROSPECTIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "idp_introspections_total",
        "Total number of token introspections",
        &["result"]
    )
    .expect("Failed to register introspections metric")
});

/// MAC oracle calls by operation and outcome.
pub static ORACLE_CALLS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "idp_oracle_calls_total",
        "Total number of MAC oracle calls",
        &["operation", "outcome"]
    )
    .expect("Failed to register oracle_calls metric")
});

/// Record an issuance outcome.
pub fn record_issuance(outcome: &str) {
    TOKENS_ISSUED.with_label_values(&[outcome]).inc();
}

/// Record an introspection result.
pub fn record_introspection(result: &str) {
    INTROSPECTIONS.with_label_values(&[result]).inc();
}

/// Record one oracle call attempt.
pub fn record_oracle_call(operation: &str, outcome: &str) {
    ORACLE_CALLS.with_label_values(&[operation, outcome]).inc();
}

/// Render the default registry in the Prometheus text format.
#[must_use]
pub fn render() -> String {
    Lazy::force(&TOKENS_ISSUED);
    Lazy::force(&INTROSPECTIONS);
    Lazy::force(&ORACLE_CALLS);

    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}
