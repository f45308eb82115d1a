//! Registry backed by a remote HTTP JSON endpoint.
//!
//! `GET {base}/clients/{clientId}` answers 200 with a [`ClientRecord`] or
//! 404 for an unknown client. Everything else is an infrastructure failure.

use super::{ClientRecord, ClientRegistry, RegistryError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_common::PlatformError;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// HTTP client registry.
#[derive(Debug, Clone)]
pub struct HttpClientRegistry {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpClientRegistry {
    /// Create a registry client. `client` should carry its own timeout; the
    /// `timeout` here only labels timeout errors.
    #[must_use]
    pub fn new(client: Client, base_url: Url, timeout: Duration) -> Self {
        Self {
            client,
            base_url,
            timeout,
        }
    }

    fn record_url(&self, client_id: &str) -> Result<Url, RegistryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RegistryError::Unavailable(format!("invalid base url {}", self.base_url)))?
            .pop_if_empty()
            .extend(["clients", client_id]);
        Ok(url)
    }

    fn map_transport(&self, err: &reqwest::Error) -> RegistryError {
        PlatformError::from_transport(err, self.timeout).into()
    }
}

#[async_trait]
impl ClientRegistry for HttpClientRegistry {
    async fn lookup(&self, client_id: &str) -> Result<Option<ClientRecord>, RegistryError> {
        // Dot segments would be resolved away and address another resource.
        if matches!(client_id, "" | "." | "..") {
            return Ok(None);
        }

        let url = self.record_url(client_id)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_transport(&e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(client_id, "client not registered");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(PlatformError::from_status(status, "client registry").into());
        }

        let bytes = response.bytes().await.map_err(|e| self.map_transport(&e))?;
        let record: ClientRecord = serde_json::from_slice(&bytes).map_err(PlatformError::from)?;

        if record.client_id != client_id {
            warn!(
                requested = client_id,
                returned = %record.client_id,
                "registry returned a record for a different client"
            );
            return Ok(None);
        }
        Ok(Some(record))
    }
}
