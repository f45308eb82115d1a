//! Shared library for cross-cutting concerns in platform Rust services.
//!
//! This crate provides:
//! - Error types with retryability classification
//! - Bounded retry with jittered exponential backoff
//! - HTTP client configuration and building
//! - Tracing subscriber setup

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod http;
pub mod retry;
pub mod tracing_config;

pub use error::{PlatformError, Retryable};
pub use http::{build_http_client, HttpConfig};
pub use retry::{RetryConfig, RetryPolicy};
pub use tracing_config::{init_tracing, TracingConfig};
