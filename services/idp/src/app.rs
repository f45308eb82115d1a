//! Wiring from [`Config`] to a ready [`AppState`].

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, OracleBackend, RegistryBackend};
use crate::http::AppState;
use crate::introspection::IntrospectionEngine;
use crate::issuance::{IssuanceEngine, IssuanceSettings};
use crate::oracle::{HttpMacOracle, LocalHmacOracle, MacOracle, ResilientMacOracle};
use crate::registry::{
    CachedClientRegistry, ClientRegistry, HttpClientRegistry, InMemoryClientRegistry,
};
use anyhow::Context;
use rust_common::{HttpConfig, RetryConfig, RetryPolicy, build_http_client};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::info;

const USER_AGENT: &str = concat!("idp-service/", env!("CARGO_PKG_VERSION"));

/// Build the registry backend, wrapped in a cache when configured.
///
/// # Errors
///
/// Fails if the HTTP client cannot be built or the seed file cannot be loaded.
pub fn build_registry(config: &Config) -> anyhow::Result<Arc<dyn ClientRegistry>> {
    let backend: Arc<dyn ClientRegistry> = match &config.registry {
        RegistryBackend::Http { url } => {
            let client = build_http_client(
                &HttpConfig::default()
                    .with_timeout(config.registry_timeout)
                    .with_user_agent(USER_AGENT),
            )
            .context("building registry http client")?;
            info!(url = %url, "using http client registry");
            Arc::new(HttpClientRegistry::new(client, url.clone(), config.registry_timeout))
        }
        RegistryBackend::File { path } => {
            let registry = InMemoryClientRegistry::from_json_file(path)
                .with_context(|| format!("loading client registry from {}", path.display()))?;
            info!(path = %path.display(), clients = registry.len(), "using file client registry");
            Arc::new(registry)
        }
    };

    if config.registry_cache_ttl.is_zero() {
        return Ok(backend);
    }
    let capacity = NonZeroUsize::new(config.registry_cache_size)
        .context("REGISTRY_CACHE_SIZE must be positive")?;
    info!(
        ttl = ?config.registry_cache_ttl,
        capacity = config.registry_cache_size,
        "client registry cache enabled"
    );
    Ok(Arc::new(CachedClientRegistry::new(
        backend,
        capacity,
        config.registry_cache_ttl,
    )))
}

/// Build the oracle backend behind timeout and retry.
///
/// # Errors
///
/// Fails if the HTTP client cannot be built or the local key is rejected.
pub fn build_oracle(config: &Config) -> anyhow::Result<Arc<dyn MacOracle>> {
    let backend: Arc<dyn MacOracle> = match &config.oracle {
        OracleBackend::Http { url, key_id } => {
            let client = build_http_client(
                &HttpConfig::default()
                    .with_timeout(config.oracle_timeout)
                    .with_user_agent(USER_AGENT),
            )
            .context("building oracle http client")?;
            info!(url = %url, key_id = %key_id, "using http mac oracle");
            Arc::new(HttpMacOracle::new(
                client,
                url.clone(),
                key_id.clone(),
                config.oracle_timeout,
            ))
        }
        OracleBackend::Local { key } => {
            info!("using local hmac oracle");
            Arc::new(LocalHmacOracle::new(key.clone()).context("loading local mac key")?)
        }
    };

    let retry = RetryPolicy::new(RetryConfig::default().with_max_retries(config.max_oracle_retries));
    Ok(Arc::new(ResilientMacOracle::new(
        backend,
        config.oracle_timeout,
        retry,
    )))
}

/// Assemble engines from their collaborators.
#[must_use]
pub fn assemble(
    config: &Config,
    registry: Arc<dyn ClientRegistry>,
    oracle: Arc<dyn MacOracle>,
    clock: Arc<dyn Clock>,
) -> AppState {
    let issuance = IssuanceEngine::new(
        Arc::clone(&registry),
        Arc::clone(&oracle),
        Arc::clone(&clock),
        IssuanceSettings {
            issuer: config.token_issuer.clone(),
            token_ttl: config.token_ttl,
            registry_timeout: config.registry_timeout,
        },
    );

    let mut introspection = IntrospectionEngine::new(oracle, clock);
    if config.introspection_check_client {
        introspection = introspection.with_client_check(registry, config.registry_timeout);
    }

    AppState {
        issuance: Arc::new(issuance),
        introspection: Arc::new(introspection),
    }
}

/// Build the full application state from configuration.
///
/// # Errors
///
/// Fails if any backend cannot be constructed.
pub fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let registry = build_registry(config)?;
    let oracle = build_oracle(config)?;
    Ok(assemble(config, registry, oracle, Arc::new(SystemClock)))
}
