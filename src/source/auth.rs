//! OAuth2 token acquisition
//!
//! The repository API expects a bearer token obtained through the
//! client-credentials grant. The provider caches the token and hands out the
//! cached value until it expires; `refresh` always performs a new grant.

use crate::source::{SourceError, SourceResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// A bearer token with its expiry instant
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub secret: String,
    pub expires_at: Instant,
}

impl AccessToken {
    /// True if the token is still safely usable
    pub fn is_valid(&self) -> bool {
        // Renew a little early so an in-flight request does not race expiry
        Instant::now() + Duration::from_secs(10) < self.expires_at
    }
}

/// Supplies bearer tokens for the repository API
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Returns a currently valid token, refreshing if needed
    async fn token(&self) -> SourceResult<AccessToken>;

    /// Forces a new grant, replacing any cached token
    async fn refresh(&self) -> SourceResult<AccessToken>;
}

/// Client-credentials OAuth2 provider
pub struct OauthProvider {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<AccessToken>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

impl OauthProvider {
    pub fn new(http: reqwest::Client, token_url: String, client_id: String, client_secret: String) -> Self {
        Self {
            http,
            token_url,
            client_id,
            client_secret,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl AuthProvider for OauthProvider {
    async fn token(&self) -> SourceResult<AccessToken> {
        {
            let cached = self.cached.lock().await;
            if let Some(token) = cached.as_ref() {
                if token.is_valid() {
                    return Ok(token.clone());
                }
            }
        }
        self.refresh().await
    }

    async fn refresh(&self) -> SourceResult<AccessToken> {
        tracing::debug!("Requesting OAuth2 token from {}", self.token_url);

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", "openid"),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    SourceError::transient(format!("token endpoint unreachable: {}", e))
                } else {
                    SourceError::fatal(format!("token request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::fatal(format!(
                "token endpoint returned HTTP {}",
                status
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| SourceError::fatal(format!("malformed token response: {}", e)))?;

        let token = AccessToken {
            secret: body.access_token,
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
        };

        let mut cached = self.cached.lock().await;
        *cached = Some(token.clone());
        Ok(token)
    }
}
