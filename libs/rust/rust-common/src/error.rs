//! Centralized error types for platform collaborators.
//!
//! Every outbound call made by a platform service (HTTP tables, crypto
//! services) fails with a [`PlatformError`]. Callers translate it into their
//! own domain error, keeping the retryable/definitive split intact.

use std::time::Duration;
use thiserror::Error;

/// Classification of errors as transient or definitive.
///
/// Implemented by every error type that flows through [`crate::RetryPolicy`].
pub trait Retryable {
    /// Whether repeating the same call may succeed.
    fn is_retryable(&self) -> bool;
}

/// Common error type for platform operations.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Response body could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Service is temporarily unavailable
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded
    #[error("Rate limited")]
    RateLimited,

    /// Collaborator rejected the request as invalid
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation did not complete within its budget
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

impl PlatformError {
    /// Check if this error is retryable.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_common::PlatformError;
    ///
    /// let err = PlatformError::RateLimited;
    /// assert!(err.is_retryable());
    ///
    /// let err = PlatformError::NotFound("client".to_string());
    /// assert!(!err.is_retryable());
    /// ```
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::RateLimited | Self::Timeout(_) => true,
            Self::Serialization(_) | Self::NotFound(_) | Self::InvalidInput(_) => false,
        }
    }

    /// Map a failed request (no usable response) to an error.
    ///
    /// `budget` is the timeout the client was configured with; it is only
    /// reported, never enforced here.
    #[must_use]
    pub fn from_transport(err: &reqwest::Error, budget: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(budget)
        } else {
            Self::Unavailable(err.to_string())
        }
    }

    /// Map a non-success HTTP status code to an error.
    ///
    /// `context` names the collaborator and is only used for diagnostics.
    #[must_use]
    pub fn from_status(status: reqwest::StatusCode, context: &str) -> Self {
        match status.as_u16() {
            404 => Self::NotFound(context.to_string()),
            408 => Self::Unavailable(format!("{context}: upstream request timeout")),
            429 => Self::RateLimited,
            400..=499 => Self::InvalidInput(format!("{context}: status {status}")),
            _ => Self::Unavailable(format!("{context}: status {status}")),
        }
    }

    /// Create an invalid input error with the given message.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl Retryable for PlatformError {
    fn is_retryable(&self) -> bool {
        PlatformError::is_retryable(self)
    }
}
