//! Centralized configuration for the identity provider.
//!
//! All configuration is loaded from environment variables (optionally via a
//! `.env` file) and validated at startup.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;
use zeroize::Zeroizing;

use crate::oracle::local::MIN_KEY_LEN;

/// Upper bound on `MAX_ORACLE_RETRIES`.
pub const MAX_ORACLE_RETRIES_LIMIT: u32 = 5;

/// Configuration errors. Fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Variable present but unparseable
    #[error("invalid {name}: {reason}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// What was wrong
        reason: String,
    },

    /// Required variable absent
    #[error("missing {0}")]
    Missing(&'static str),
}

impl ConfigError {
    fn invalid(name: &'static str, reason: impl fmt::Display) -> Self {
        Self::Invalid {
            name,
            reason: reason.to_string(),
        }
    }
}

/// Where MACs come from.
#[derive(Clone)]
pub enum OracleBackend {
    /// Remote HTTP oracle
    Http {
        /// Base URL
        url: Url,
        /// Key identifier sent with every call
        key_id: String,
    },
    /// In-process HMAC with a locally supplied key
    Local {
        /// Raw key bytes
        key: Zeroizing<Vec<u8>>,
    },
}

impl fmt::Debug for OracleBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { url, key_id } => f
                .debug_struct("Http")
                .field("url", &url.as_str())
                .field("key_id", key_id)
                .finish(),
            Self::Local { .. } => f.debug_struct("Local").field("key", &"[REDACTED]").finish(),
        }
    }
}

/// Where client records come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryBackend {
    /// Remote HTTP registry
    Http {
        /// Base URL
        url: Url,
    },
    /// JSON file loaded into memory at startup
    File {
        /// Path to the JSON array of client records
        path: PathBuf,
    },
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Server settings
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Whole-request budget
    pub request_timeout: Duration,

    // Token settings
    /// `iss` claim
    pub token_issuer: String,
    /// Token lifetime
    pub token_ttl: Duration,

    // Oracle settings
    /// Oracle backend
    pub oracle: OracleBackend,
    /// Per-attempt oracle timeout
    pub oracle_timeout: Duration,
    /// Retries after a transient oracle failure
    pub max_oracle_retries: u32,

    // Registry settings
    /// Registry backend
    pub registry: RegistryBackend,
    /// Registry lookup timeout
    pub registry_timeout: Duration,
    /// Cache TTL; zero disables the cache
    pub registry_cache_ttl: Duration,
    /// Cache capacity
    pub registry_cache_size: usize,

    // Introspection
    /// Require the token's client to still be active
    pub introspection_check_client: bool,

    // Logging
    /// Log level / filter directive
    pub log_level: String,
    /// Emit JSON logs
    pub log_json: bool,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let host = vars.string("HOST", "0.0.0.0");
        let port = vars.parse("PORT", 8080u16)?;
        let request_timeout = vars.secs("REQUEST_TIMEOUT", 10)?;

        let token_issuer = vars.string("TOKEN_ISSUER", "open-idp");
        if token_issuer.is_empty() {
            return Err(ConfigError::invalid("TOKEN_ISSUER", "must not be empty"));
        }
        let token_ttl = vars.secs("TOKEN_TTL", 3600)?;

        let oracle = match vars.get("ORACLE_URL") {
            Some(raw) => OracleBackend::Http {
                url: parse_url("ORACLE_URL", &raw)?,
                key_id: vars.string("ORACLE_KEY_ID", "alias/idp-signing"),
            },
            None => OracleBackend::Local {
                key: parse_local_key(vars.get("LOCAL_MAC_KEY"))?,
            },
        };
        let oracle_timeout = vars.millis("ORACLE_TIMEOUT", 2000)?;
        let max_oracle_retries = vars.parse("MAX_ORACLE_RETRIES", 1u32)?;
        if max_oracle_retries > MAX_ORACLE_RETRIES_LIMIT {
            return Err(ConfigError::invalid(
                "MAX_ORACLE_RETRIES",
                format!("must be at most {MAX_ORACLE_RETRIES_LIMIT}"),
            ));
        }

        let registry = match (vars.get("REGISTRY_URL"), vars.get("REGISTRY_FILE")) {
            (Some(raw), _) => RegistryBackend::Http {
                url: parse_url("REGISTRY_URL", &raw)?,
            },
            (None, Some(path)) => RegistryBackend::File {
                path: PathBuf::from(path),
            },
            (None, None) => return Err(ConfigError::Missing("REGISTRY_URL or REGISTRY_FILE")),
        };
        let registry_timeout = vars.millis("REGISTRY_TIMEOUT", 2000)?;
        let registry_cache_ttl = Duration::from_secs(vars.parse("REGISTRY_CACHE_TTL", 0u64)?);
        let registry_cache_size = vars.parse("REGISTRY_CACHE_SIZE", 1024usize)?;
        if registry_cache_size == 0 {
            return Err(ConfigError::invalid("REGISTRY_CACHE_SIZE", "must be positive"));
        }

        let introspection_check_client = vars.parse("INTROSPECTION_CHECK_CLIENT", false)?;

        let log_level = vars.string("LOG_LEVEL", "info");
        let log_json = vars.parse("LOG_JSON", true)?;

        Ok(Self {
            host,
            port,
            request_timeout,
            token_issuer,
            token_ttl,
            oracle,
            oracle_timeout,
            max_oracle_retries,
            registry,
            registry_timeout,
            registry_cache_ttl,
            registry_cache_size,
            introspection_check_client,
            log_level,
            log_json,
        })
    }

    /// Socket address string to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.trim().is_empty())
    }

    fn string(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }

    /// Parse environment variable with default value.
    fn parse<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T::Err: fmt::Display,
    {
        match self.get(name) {
            Some(val) => val.trim().parse().map_err(|e| ConfigError::invalid(name, e)),
            None => Ok(default),
        }
    }

    fn secs(&self, name: &'static str, default: u64) -> Result<Duration, ConfigError> {
        positive(name, self.parse(name, default)?).map(Duration::from_secs)
    }

    fn millis(&self, name: &'static str, default: u64) -> Result<Duration, ConfigError> {
        positive(name, self.parse(name, default)?).map(Duration::from_millis)
    }
}

fn positive(name: &'static str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::invalid(name, "must be positive"));
    }
    Ok(value)
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::invalid(name, e))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::invalid(name, "expected an http(s) base url"));
    }
    Ok(url)
}

fn parse_local_key(raw: Option<String>) -> Result<Zeroizing<Vec<u8>>, ConfigError> {
    let raw = Zeroizing::new(raw.ok_or(ConfigError::Missing("ORACLE_URL or LOCAL_MAC_KEY"))?);
    let key = Zeroizing::new(
        STANDARD
            .decode(raw.trim())
            .map_err(|e| ConfigError::invalid("LOCAL_MAC_KEY", e))?,
    );
    if key.len() < MIN_KEY_LEN {
        return Err(ConfigError::invalid(
            "LOCAL_MAC_KEY",
            format!("must decode to at least {MIN_KEY_LEN} bytes, got {}", key.len()),
        ));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    fn local_key() -> String {
        STANDARD.encode([9u8; 32])
    }

    #[test]
    fn test_defaults() {
        let key = local_key();
        let config = load(&[("LOCAL_MAC_KEY", &key), ("REGISTRY_FILE", "clients.json")]).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.token_issuer, "open-idp");
        assert_eq!(config.token_ttl, Duration::from_secs(3600));
        assert_eq!(config.oracle_timeout, Duration::from_millis(2000));
        assert_eq!(config.max_oracle_retries, 1);
        assert_eq!(config.registry_timeout, Duration::from_millis(2000));
        assert_eq!(config.registry_cache_ttl, Duration::ZERO);
        assert_eq!(config.registry_cache_size, 1024);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(!config.introspection_check_client);
        assert!(config.log_json);
        assert!(matches!(config.oracle, OracleBackend::Local { .. }));
        assert_eq!(
            config.registry,
            RegistryBackend::File {
                path: PathBuf::from("clients.json")
            }
        );
    }

    #[test]
    fn test_http_backends() {
        let config = load(&[
            ("ORACLE_URL", "https://oracle.internal"),
            ("ORACLE_KEY_ID", "alias/test"),
            ("REGISTRY_URL", "http://registry.internal/api"),
            ("REGISTRY_FILE", "ignored.json"),
        ])
        .unwrap();

        match &config.oracle {
            OracleBackend::Http { url, key_id } => {
                assert_eq!(url.host_str(), Some("oracle.internal"));
                assert_eq!(key_id, "alias/test");
            }
            OracleBackend::Local { .. } => panic!("expected http oracle"),
        }
        assert!(matches!(config.registry, RegistryBackend::Http { .. }));
    }

    #[test]
    fn test_missing_backends() {
        assert!(matches!(
            load(&[("REGISTRY_FILE", "c.json")]),
            Err(ConfigError::Missing(_))
        ));
        let key = local_key();
        assert!(matches!(
            load(&[("LOCAL_MAC_KEY", &key)]),
            Err(ConfigError::Missing(_))
        ));
    }

    #[test]
    fn test_invalid_values() {
        let key = local_key();
        let base = [("LOCAL_MAC_KEY", key.as_str()), ("REGISTRY_FILE", "c.json")];

        for (name, value) in [
            ("PORT", "eighty"),
            ("TOKEN_TTL", "0"),
            ("ORACLE_TIMEOUT", "0"),
            ("MAX_ORACLE_RETRIES", "6"),
            ("REGISTRY_CACHE_SIZE", "0"),
            ("LOG_JSON", "maybe"),
            ("REGISTRY_URL", "ftp://registry"),
        ] {
            let mut pairs = base.to_vec();
            pairs.push((name, value));
            assert!(load(&pairs).is_err(), "{name}={value} accepted");
        }
    }

    #[test]
    fn test_short_local_key_rejected() {
        let short = STANDARD.encode([1u8; 16]);
        let result = load(&[("LOCAL_MAC_KEY", &short), ("REGISTRY_FILE", "c.json")]);
        assert!(matches!(result, Err(ConfigError::Invalid { name: "LOCAL_MAC_KEY", .. })));
    }

    #[test]
    fn test_debug_redacts_local_key() {
        let key = local_key();
        let config = load(&[("LOCAL_MAC_KEY", &key), ("REGISTRY_FILE", "c.json")]).unwrap();
        let rendered = format!("{config:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains(&key));
    }
}
