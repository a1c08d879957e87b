//! ipinfo.io client

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::client::WeatherError;
use crate::models::IpDetails;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Base URL (default: <https://ipinfo.io>)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://ipinfo.io".to_string()
}

const fn default_timeout() -> u64 {
    10
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Vault secret holding the ipinfo token
#[derive(Clone, Deserialize)]
pub struct IpinfoCredentials {
    pub token: String,
}

impl fmt::Debug for IpinfoCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IpinfoCredentials")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
pub trait LocationClient: Send + Sync {
    /// Details for the public address the request leaves from
    async fn own_details(&self, credentials: &IpinfoCredentials) -> Result<IpDetails, WeatherError>;
}

#[derive(Debug)]
pub struct IpinfoClient {
    client: Client,
    config: LocationConfig,
}

impl IpinfoClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: LocationConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WeatherError::ConnectionFailed(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl LocationClient for IpinfoClient {
    #[instrument(skip(self, credentials))]
    async fn own_details(&self, credentials: &IpinfoCredentials) -> Result<IpDetails, WeatherError> {
        let url = format!("{}/json", self.config.base_url.trim_end_matches('/'));
        debug!(url = %url, "Looking up location");

        let response = self
            .client
            .get(&url)
            .query(&[("token", credentials.token.as_str())])
            .send()
            .await
            .map_err(|e| WeatherError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WeatherError::RequestFailed(e.to_string()))?;
        if !status.is_success() {
            return Err(WeatherError::from_status(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| WeatherError::ParseError(e.to_string()))
    }
}
