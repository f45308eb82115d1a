//! Property-based tests for rust-common crate.

use proptest::prelude::*;
use rust_common::{PlatformError, RetryConfig, RetryPolicy};
use std::time::Duration;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Retryability is a function of the variant only, never of the message.
    #[test]
    fn prop_retryable_errors_are_consistent(msg in "[a-zA-Z0-9 ]{1,50}") {
        let retryable = vec![
            PlatformError::RateLimited,
            PlatformError::Unavailable(msg.clone()),
            PlatformError::Timeout(Duration::from_millis(5)),
        ];
        for err in retryable {
            prop_assert!(err.is_retryable(), "Error {:?} should be retryable", err);
        }

        let definitive = vec![
            PlatformError::NotFound(msg.clone()),
            PlatformError::InvalidInput(msg.clone()),
        ];
        for err in definitive {
            prop_assert!(!err.is_retryable(), "Error {:?} should not be retryable", err);
        }
    }

    /// Server-side failures are retryable; client-side rejections are not.
    #[test]
    fn prop_status_classification(code in 400u16..600) {
        let status = reqwest::StatusCode::from_u16(code).unwrap();
        let err = PlatformError::from_status(status, "collaborator");
        if code >= 500 || code == 429 || code == 408 {
            prop_assert!(err.is_retryable());
        } else {
            prop_assert!(!err.is_retryable());
        }
    }

    /// Backoff never exceeds the configured cap, with or without jitter.
    #[test]
    fn prop_delay_respects_cap(
        attempt in 0u32..64,
        initial_ms in 1u64..500,
        cap_ms in 1u64..5_000,
        jitter in any::<bool>(),
    ) {
        let mut config = RetryConfig::default()
            .with_initial_delay(Duration::from_millis(initial_ms))
            .with_max_delay(Duration::from_millis(cap_ms));
        if !jitter {
            config = config.without_jitter();
        }
        let policy = RetryPolicy::new(config);
        let delay = policy.delay_for_attempt(attempt);
        prop_assert!(delay <= Duration::from_millis(cap_ms) + Duration::from_micros(1));
    }

    /// The retry budget is never exceeded.
    #[test]
    fn prop_should_retry_bounded(max_retries in 0u32..5, attempt in 0u32..10) {
        let policy = RetryPolicy::new(RetryConfig::default().with_max_retries(max_retries));
        let allowed = policy.should_retry(&PlatformError::RateLimited, attempt);
        prop_assert_eq!(allowed, attempt < max_retries);
    }
}
