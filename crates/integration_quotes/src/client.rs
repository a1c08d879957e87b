//! quotes.rest client

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

const DEFAULT_RATE_LIMIT_MESSAGE: &str = "Too many requests";

#[derive(Debug, Error)]
pub enum QuotesError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    /// Carries the API's own explanation
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Response parsed but held no quote
    #[error("No quote in response: {0}")]
    NoQuote(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotesConfig {
    /// Base URL (default: <https://quotes.rest>)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://quotes.rest".to_string()
}

const fn default_timeout() -> u64 {
    10
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Today's quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyQuote {
    pub quote: String,
    pub author: String,
    pub title: String,
}

#[async_trait]
pub trait QuotesClient: Send + Sync {
    async fn quote_of_the_day(&self) -> Result<DailyQuote, QuotesError>;
}

#[derive(Debug, Deserialize)]
struct QodResponse {
    #[serde(default)]
    contents: Option<QodContents>,
}

#[derive(Debug, Deserialize)]
struct QodContents {
    #[serde(default)]
    quotes: Vec<DailyQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug)]
pub struct QuotesHttpClient {
    client: Client,
    config: QuotesConfig,
}

impl QuotesHttpClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: QuotesConfig) -> Result<Self, QuotesError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| QuotesError::ConnectionFailed(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn with_defaults() -> Result<Self, QuotesError> {
        Self::new(QuotesConfig::default())
    }

    fn rate_limit_message(body: &str) -> String {
        serde_json::from_str::<ErrorResponse>(body)
            .unwrap_or_default()
            .error
            .and_then(|e| e.message)
            .unwrap_or_else(|| DEFAULT_RATE_LIMIT_MESSAGE.to_string())
    }
}

#[async_trait]
impl QuotesClient for QuotesHttpClient {
    #[instrument(skip(self))]
    async fn quote_of_the_day(&self) -> Result<DailyQuote, QuotesError> {
        let url = format!("{}/qod.json", self.config.base_url.trim_end_matches('/'));
        debug!(url = %url, "Fetching new quote");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| QuotesError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| QuotesError::RequestFailed(e.to_string()))?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            let message = Self::rate_limit_message(&body);
            warn!(%message, "Quote API rate limited");
            return Err(QuotesError::RateLimited(message));
        }
        if !status.is_success() {
            return Err(QuotesError::RequestFailed(format!("HTTP {status}")));
        }

        let parsed: QodResponse =
            serde_json::from_str(&body).map_err(|e| QuotesError::ParseError(e.to_string()))?;
        parsed
            .contents
            .and_then(|c| c.quotes.into_iter().next())
            .ok_or(QuotesError::NoQuote(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = QuotesConfig::default();
        assert_eq!(config.base_url, "https://quotes.rest");
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn rate_limit_message_from_body() {
        let body = r#"{"error": {"code": 429, "message": "Too Many Requests: Rate limit of 10 requests per hour exceeded."}}"#;
        assert!(QuotesHttpClient::rate_limit_message(body).starts_with("Too Many Requests: Rate"));
    }

    #[test]
    fn rate_limit_message_defaults() {
        assert_eq!(QuotesHttpClient::rate_limit_message("oops"), "Too many requests");
        assert_eq!(QuotesHttpClient::rate_limit_message("{}"), "Too many requests");
    }

    #[test]
    fn client_creation() {
        assert!(QuotesHttpClient::with_defaults().is_ok());
    }
}
