//! OpenWeatherMap One Call client

use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::models::OneCall;

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";

/// Errors shared by the weather and location clients
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    /// Key or token rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid coordinates: latitude must be -90 to 90, longitude must be -180 to 180")]
    InvalidCoordinates,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

impl WeatherError {
    /// Classify a non-success response
    pub(crate) fn from_status(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized(body.to_string()),
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimitExceeded,
            _ => Self::RequestFailed(format!("HTTP {status}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// One Call base URL (default: <https://api.openweathermap.org/data/3.0>)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// `standard`, `metric` or `imperial` (default: imperial)
    #[serde(default = "default_units")]
    pub units: String,
}

fn default_base_url() -> String {
    "https://api.openweathermap.org/data/3.0".to_string()
}

const fn default_timeout() -> u64 {
    10
}

fn default_units() -> String {
    "imperial".to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            units: default_units(),
        }
    }
}

/// Vault secret holding the One Call key
#[derive(Clone, Deserialize)]
pub struct OpenWeatherCredentials {
    pub api_key: String,
}

impl fmt::Debug for OpenWeatherCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenWeatherCredentials")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// URL of a weather icon; `large` selects the double-size image
#[must_use]
pub fn icon_url(code: &str, large: bool) -> String {
    if large {
        format!("{ICON_BASE_URL}/{code}@2x.png")
    } else {
        format!("{ICON_BASE_URL}/{code}.png")
    }
}

#[async_trait]
pub trait WeatherClient: Send + Sync {
    /// Current conditions and the daily forecast at a point
    async fn one_call(
        &self,
        credentials: &OpenWeatherCredentials,
        latitude: f64,
        longitude: f64,
    ) -> Result<OneCall, WeatherError>;
}

#[derive(Debug)]
pub struct OpenWeatherClient {
    client: Client,
    config: WeatherConfig,
}

impl OpenWeatherClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WeatherError::ConnectionFailed(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn with_defaults() -> Result<Self, WeatherError> {
        Self::new(WeatherConfig::default())
    }

    fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), WeatherError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(WeatherError::InvalidCoordinates);
        }
        Ok(())
    }
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    #[instrument(skip(self, credentials))]
    async fn one_call(
        &self,
        credentials: &OpenWeatherCredentials,
        latitude: f64,
        longitude: f64,
    ) -> Result<OneCall, WeatherError> {
        Self::validate_coordinates(latitude, longitude)?;
        let url = format!("{}/onecall", self.config.base_url.trim_end_matches('/'));
        debug!(url = %url, "Fetching weather");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("units", self.config.units.clone()),
                ("exclude", "minutely,hourly,alerts".to_string()),
                ("appid", credentials.api_key.clone()),
            ])
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
