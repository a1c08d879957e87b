//! SolarEdge monitoring client
//!
//! HTTP client for the SolarEdge monitoring API.

use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::models::{CurrentPowerFlow, EnergyDetails, EnergyDetailsResponse, PowerFlowResponse};

/// Timestamp format the API expects for `startTime`/`endTime`
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SolarEdge client errors
#[derive(Debug, Error)]
pub enum SolarEdgeError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    /// API key rejected or site not accessible with it
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The API allows 300 requests per day per site
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolarEdgeConfig {
    /// API base URL (default: <https://monitoringapi.solaredge.com>)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://monitoringapi.solaredge.com".to_string()
}

const fn default_timeout() -> u64 {
    30
}

impl Default for SolarEdgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Site credentials, normally read from the secret store
#[derive(Clone, Deserialize)]
pub struct SolarEdgeCredentials {
    pub site_id: String,
    pub api_key: String,
}

impl fmt::Debug for SolarEdgeCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolarEdgeCredentials")
            .field("site_id", &self.site_id)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
pub trait SolarEdgeClient: Send + Sync {
    /// Meter totals between `start` and `end`, one value per meter
    async fn energy_details(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<EnergyDetails, SolarEdgeError>;

    async fn current_power_flow(&self) -> Result<CurrentPowerFlow, SolarEdgeError>;

    async fn is_healthy(&self) -> bool;
}

/// reqwest-backed [`SolarEdgeClient`]
#[derive(Debug)]
pub struct SolarEdgeHttpClient {
    client: Client,
    config: SolarEdgeConfig,
    credentials: SolarEdgeCredentials,
}

impl SolarEdgeHttpClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(
        config: SolarEdgeConfig,
        credentials: SolarEdgeCredentials,
    ) -> Result<Self, SolarEdgeError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SolarEdgeError::ConnectionFailed(e.to_string()))?;
        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    fn site_url(&self, endpoint: &str) -> String {
        format!(
            "{}/site/{}/{endpoint}",
            self.config.base_url.trim_end_matches('/'),
            self.credentials.site_id
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, SolarEdgeError> {
        debug!(url = %url, "Calling SolarEdge");
        let response = self
            .client
            .get(url)
            .query(query)
            .query(&[("api_key", self.credentials.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    SolarEdgeError::ConnectionFailed(e.to_string())
                } else {
                    SolarEdgeError::RequestFailed(e.to_string())
                }
            })?;
        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| SolarEdgeError::ParseError(e.to_string()))
    }

    async fn check_status(response: Response) -> Result<Response, SolarEdgeError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::TOO_MANY_REQUESTS => SolarEdgeError::RateLimitExceeded,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                SolarEdgeError::Unauthorized(format!("HTTP {status}: {body}"))
            },
            s if s.is_server_error() => SolarEdgeError::ServiceUnavailable(format!("HTTP {s}")),
            s => SolarEdgeError::RequestFailed(format!("HTTP {s}: {body}")),
        })
    }
}

#[async_trait]
impl SolarEdgeClient for SolarEdgeHttpClient {
    #[instrument(skip(self), fields(site = %self.credentials.site_id))]
    async fn energy_details(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<EnergyDetails, SolarEdgeError> {
        let query = [
            ("startTime", start.format(TIME_FORMAT).to_string()),
            ("endTime", end.format(TIME_FORMAT).to_string()),
            ("timeUnit", "DAY".to_string()),
        ];
        let body: EnergyDetailsResponse = self
            .get_json(&self.site_url("energyDetails"), &query)
            .await?;
        Ok(body.energy_details.into())
    }

    #[instrument(skip(self), fields(site = %self.credentials.site_id))]
    async fn current_power_flow(&self) -> Result<CurrentPowerFlow, SolarEdgeError> {
        let body: PowerFlowResponse = self
            .get_json(&self.site_url("currentPowerFlow"), &[])
            .await?;
        Ok(body.site_current_power_flow)
    }

    async fn is_healthy(&self) -> bool {
        self.current_power_flow().await.is_ok()
    }
}
