//! Identity provider library.
//!
//! Issues client-credentials access tokens whose MAC is produced by an
//! external oracle, and introspects them on demand. The service holds no
//! key material and stores no tokens.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod introspection;
pub mod issuance;
pub mod metrics;
pub mod oracle;
pub mod registry;
pub mod token;

// Re-exports for convenience
pub use config::Config;
pub use error::IdpError;
