//! OAuth2 client-credentials token lifecycle
//!
//! The cached token is reused until it is within `REFRESH_MARGIN_SECS` of its
//! expiry. The check-and-refresh sequence runs under an async mutex, so
//! concurrent callers wait for a single refresh instead of racing.

use super::error::{Result, SdsError};
use super::transport::HttpTransport;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// A cached token is never handed out this close to its expiry
pub const REFRESH_MARGIN_SECS: i64 = 5 * 60;

const SCHEME: &str = "Bearer ";

/// Static credential part of the token state
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    /// Account or tenant id, used in the identity endpoint path
    pub owner_id: String,
    pub resource: String,
    /// Replaces the derived identity endpoint when set
    pub token_endpoint: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("owner_id", &self.owner_id)
            .field("resource", &self.resource)
            .field("token_endpoint", &self.token_endpoint)
            .finish()
    }
}

impl Credentials {
    /// Token endpoint for these credentials
    ///
    /// `https://identity.<resource>/account/<id>/authentication/connect/token`
    /// where `<resource>` has its `https://` prefix and trailing slash removed.
    pub fn token_endpoint(&self) -> String {
        if let Some(endpoint) = &self.token_endpoint {
            return endpoint.clone();
        }
        let resource = self.resource.strip_prefix("https://").unwrap_or(&self.resource);
        let resource = resource.strip_suffix('/').unwrap_or(resource);
        format!(
            "https://identity.{}/account/{}/authentication/connect/token",
            resource, self.owner_id
        )
    }
}

#[derive(Debug, Default)]
struct TokenState {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl TokenState {
    fn fresh_token(&self, now: DateTime<Utc>) -> Option<&str> {
        let expires_at = self.expires_at?;
        if (expires_at - now).num_seconds() > REFRESH_MARGIN_SECS {
            Some(&self.token)
        } else {
            None
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: f64,
}

/// Produces bearer tokens, refreshing only when near expiry
pub struct TokenManager {
    transport: Arc<dyn HttpTransport>,
    credentials: Credentials,
    state: Mutex<TokenState>,
}

impl TokenManager {
    pub fn new(transport: Arc<dyn HttpTransport>, credentials: Credentials) -> Self {
        TokenManager {
            transport,
            credentials,
            state: Mutex::new(TokenState::default()),
        }
    }

    /// Seed the cache with an already-issued token
    pub fn with_cached_token(self, token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        TokenManager {
            state: Mutex::new(TokenState {
                token: token.into(),
                expires_at: Some(expires_at),
            }),
            ..self
        }
    }

    /// Recorded expiry of the cached token, if any
    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.expires_at
    }

    /// Return a valid `Bearer <token>` header value
    pub async fn get_token(&self) -> Result<String> {
        let mut state = self.state.lock().await;

        if let Some(token) = state.fresh_token(Utc::now()) {
            return Ok(format!("{}{}", SCHEME, token));
        }

        let endpoint = self.credentials.token_endpoint();
        debug!("Requesting token from {}", endpoint);

        let form = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("grant_type", "client_credentials"),
            ("scope", "api"),
        ];
        let response = self.transport.post_form(&endpoint, &form).await.map_err(|e| {
            warn!("Error requesting token: {}", e);
            e
        })?;

        if !response.is_success() {
            let err = SdsError::http_status(response.status, &response.body);
            warn!("Error requesting token: {}", err);
            return Err(err);
        }

        let parsed: TokenResponse = serde_json::from_slice(&response.body).map_err(|e| {
            warn!("Error parsing token response: {}", e);
            SdsError::Decode(format!("token response: {}", e))
        })?;

        let lifetime = TimeDelta::try_seconds(parsed.expires_in as i64).ok_or_else(|| {
            SdsError::Decode(format!("expires_in out of range: {}", parsed.expires_in))
        })?;

        state.token = parsed.access_token;
        state.expires_at = Some(Utc::now() + lifetime);

        Ok(format!("{}{}", SCHEME, state.token))
    }
}
