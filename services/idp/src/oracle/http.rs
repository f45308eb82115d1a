//! HTTP JSON adapter for a remote MAC oracle.
//!
//! Wire contract:
//!
//! - `POST {base}/v1/mac/generate` `{"keyId","message","macAlgorithm"}` → `{"mac"}`
//! - `POST {base}/v1/mac/verify` `{"keyId","message","mac","macAlgorithm"}` → `{"macValid"}`
//!
//! `message` and `mac` are standard base64. A 400 whose body names the
//! `InvalidMac` error type is a definitive mismatch.

use super::{MacOracle, OracleError};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, Response, StatusCode};
use rust_common::PlatformError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

const MAC_ALGORITHM: &str = "HMAC_SHA_256";
const INVALID_MAC: &str = "InvalidMac";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    key_id: &'a str,
    message: String,
    mac_algorithm: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest<'a> {
    key_id: &'a str,
    message: String,
    mac: String,
    mac_algorithm: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    mac: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponse {
    mac_valid: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default, alias = "__type")]
    error_type: Option<String>,
}

/// Remote oracle client.
#[derive(Debug, Clone)]
pub struct HttpMacOracle {
    client: Client,
    base_url: Url,
    key_id: String,
    timeout: Duration,
}

impl HttpMacOracle {
    /// Create an oracle client. `client` carries the per-request timeout;
    /// `timeout` is only reported in timeout errors.
    #[must_use]
    pub fn new(client: Client, base_url: Url, key_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url,
            key_id: key_id.into(),
            timeout,
        }
    }

    fn endpoint(&self, operation: &str) -> Result<Url, OracleError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| OracleError::Rejected(format!("invalid base url {}", self.base_url)))?
            .pop_if_empty()
            .extend(["v1", "mac", operation]);
        Ok(url)
    }

    fn transport_error(&self, err: &reqwest::Error) -> OracleError {
        PlatformError::from_transport(err, self.timeout).into()
    }

    async fn post<B: Serialize + Sync>(&self, operation: &str, body: &B) -> Result<Response, OracleError> {
        let url = self.endpoint(operation)?;
        self.client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(&self, response: Response) -> Result<T, OracleError> {
        let bytes = response.bytes().await.map_err(|e| self.transport_error(&e))?;
        Ok(serde_json::from_slice(&bytes).map_err(PlatformError::from)?)
    }
}

#[async_trait]
impl MacOracle for HttpMacOracle {
    async fn generate_mac(&self, message: &[u8]) -> Result<Vec<u8>, OracleError> {
        let request = GenerateRequest {
            key_id: &self.key_id,
            message: STANDARD.encode(message),
            mac_algorithm: MAC_ALGORITHM,
        };
        let response = self.post("generate", &request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PlatformError::from_status(status, "mac oracle generate").into());
        }

        let body: GenerateResponse = self.read_json(response).await?;
        let tag = STANDARD
            .decode(body.mac)
            .map_err(|e| OracleError::Malformed(e.to_string()))?;
        if tag.is_empty() {
            return Err(OracleError::Malformed("empty mac".to_string()));
        }
        Ok(tag)
    }

    async fn verify_mac(&self, message: &[u8], tag: &[u8]) -> Result<bool, OracleError> {
        let request = VerifyRequest {
            key_id: &self.key_id,
            message: STANDARD.encode(message),
            mac: STANDARD.encode(tag),
            mac_algorithm: MAC_ALGORITHM,
        };
        let response = self.post("verify", &request).await?;
        let status = response.status();

        if status == StatusCode::BAD_REQUEST {
            let body: ErrorBody = self.read_json(response).await?;
            if body.error_type.as_deref() == Some(INVALID_MAC) {
                debug!("oracle reported invalid mac");
                return Ok(false);
            }
            return Err(OracleError::Rejected(format!(
                "verify rejected: {}",
                body.error_type.as_deref().unwrap_or("unknown")
            )));
        }
        if !status.is_success() {
            return Err(PlatformError::from_status(status, "mac oracle verify").into());
        }

        let body: VerifyResponse = self.read_json(response).await?;
        Ok(body.mac_valid)
    }
}
