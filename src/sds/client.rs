use super::addressing::Addressing;
use super::error::{Result, SdsError};
use super::transport::HttpTransport;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

/// Longest body excerpt written to the log on decode failures
const LOGGED_BODY_LIMIT: usize = 512;

/// Main SDS REST client
///
/// Holds the transport and addressing; carries no token state. Callers pass a
/// full `Authorization` header value (`Bearer ...`) into every fetch.
#[derive(Clone)]
pub struct SdsClient {
    transport: Arc<dyn HttpTransport>,
    resource: String,
    api_version: String,
    addressing: Addressing,
}

impl SdsClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        resource: impl Into<String>,
        api_version: impl Into<String>,
        addressing: Addressing,
    ) -> Self {
        SdsClient {
            transport,
            resource: resource.into(),
            api_version: api_version.into(),
            addressing,
        }
    }

    pub fn addressing(&self) -> &Addressing {
        &self.addressing
    }

    /// Base path all collection requests hang off
    pub fn base_path(&self) -> String {
        self.addressing.base_path(&self.resource, &self.api_version)
    }

    /// Path probed by the health check
    pub fn health_path(&self) -> String {
        self.addressing.health_path(&self.resource, &self.api_version)
    }

    /// Single authenticated GET; returns the body of a 2xx response
    pub async fn fetch(
        &self,
        token: &str,
        path: &str,
        extra_headers: &[(String, String)],
    ) -> Result<Vec<u8>> {
        debug!("Making query to {}", path);

        let mut headers = Vec::with_capacity(extra_headers.len() + 1);
        headers.push(("Authorization".to_string(), token.to_string()));
        headers.extend_from_slice(extra_headers);

        let response = self.transport.get(path, &headers).await.map_err(|e| {
            warn!("Error making request: {}", e);
            e
        })?;

        if !response.is_success() {
            let err = SdsError::http_status(response.status, &response.body);
            warn!("Error making request: {}", err);
            return Err(err);
        }

        Ok(response.body)
    }

    /// GET and decode a JSON body
    pub async fn fetch_json<T: DeserializeOwned>(&self, token: &str, path: &str) -> Result<T> {
        let body = self.fetch(token, path, &[]).await?;
        decode_json(&body)
    }
}

/// Decode a response body, logging an excerpt of it on failure
pub(crate) fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| {
        let text = String::from_utf8_lossy(body);
        let excerpt: String = text.chars().take(LOGGED_BODY_LIMIT).collect();
        warn!("Error parsing json: {} (body: {})", e, excerpt);
        SdsError::Decode(e.to_string())
    })
}
