//! Pushed.co client

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum PushedError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Pushed answered with a non-2xx status
    #[error("Push rejected: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushedConfig {
    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

const fn default_timeout() -> u64 {
    10
}

impl Default for PushedConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

/// App credentials and endpoint, as stored in the secret store
#[derive(Clone, Deserialize)]
pub struct PushedCredentials {
    pub app_key: String,
    pub app_secret: String,
    /// Push endpoint, e.g. `https://api.pushed.co/1/push`
    pub url: String,
}

impl fmt::Debug for PushedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushedCredentials")
            .field("app_key", &self.app_key)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait PushedClient: Send + Sync {
    /// Push `{node}.{app} -> {msg}` to the app's subscribers
    async fn push(&self, node: &str, app: &str, msg: &str) -> Result<(), PushedError>;
}

#[derive(Debug)]
pub struct PushedHttpClient {
    client: Client,
    credentials: PushedCredentials,
}

impl PushedHttpClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: &PushedConfig, credentials: PushedCredentials) -> Result<Self, PushedError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PushedError::ConnectionFailed(e.to_string()))?;
        Ok(Self {
            client,
            credentials,
        })
    }

    /// Text shown on the device
    #[must_use]
    pub fn content(node: &str, app: &str, msg: &str) -> String {
        format!("{node}.{app} -> {msg}")
    }
}

#[async_trait]
impl PushedClient for PushedHttpClient {
    #[instrument(skip(self, msg))]
    async fn push(&self, node: &str, app: &str, msg: &str) -> Result<(), PushedError> {
        let content = Self::content(node, app, msg);
        debug!(url = %self.credentials.url, "Sending push notification");
        let form = [
            ("app_key", self.credentials.app_key.as_str()),
            ("app_secret", self.credentials.app_secret.as_str()),
            ("target_type", "app"),
            ("content", content.as_str()),
        ];
        let response = self
            .client
            .post(&self.credentials.url)
            .form(&form)
            .send()
            .await
            .map_err(|e| PushedError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(PushedError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        info!(response = %body, "Push notification sent");
        Ok(())
    }
}
