//! Quotes adapter - Implements QuotePort using integration_quotes

use application::ApplicationError;
use application::ports::QuotePort;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use domain::Quote;
use integration_quotes::{QuotesClient, QuotesConfig, QuotesError, QuotesHttpClient};
use tracing::{info, instrument};

/// Adapter for the quote-of-the-day service
pub struct QuotesAdapter {
    client: Box<dyn QuotesClient>,
}

impl std::fmt::Debug for QuotesAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotesAdapter")
            .field("client", &"QuotesClient")
            .finish()
    }
}

impl QuotesAdapter {
    pub fn new(client: Box<dyn QuotesClient>) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to initialize.
    pub fn with_config(config: QuotesConfig) -> Result<Self, ApplicationError> {
        let client =
            QuotesHttpClient::new(config).map_err(|e| ApplicationError::Internal(e.to_string()))?;
        Ok(Self::new(Box::new(client)))
    }

    fn map_error(err: QuotesError) -> ApplicationError {
        match err {
            QuotesError::ConnectionFailed(e) | QuotesError::RequestFailed(e) => {
                ApplicationError::ExternalService(e)
            },
            QuotesError::ParseError(e) => {
                ApplicationError::ExternalService(format!("Unexpected quote response: {e}"))
            },
            QuotesError::RateLimited(message) => ApplicationError::RateLimited(message),
            QuotesError::NoQuote(e) => ApplicationError::NotFound(e),
        }
    }
}

#[async_trait]
impl QuotePort for QuotesAdapter {
    #[instrument(skip(self))]
    async fn quote_of_the_day(&self, now: NaiveDateTime) -> Result<Quote, ApplicationError> {
        let daily = self
            .client
            .quote_of_the_day()
            .await
            .map_err(Self::map_error)?;
        info!(author = %daily.author, title = %daily.title, "Quote of the day received");
        Ok(Quote {
            quote: daily.quote,
            author: daily.author,
            title: daily.title,
            datetime: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use integration_quotes::DailyQuote;

    struct FakeClient(Option<QuotesError>);

    #[async_trait]
    impl QuotesClient for FakeClient {
        async fn quote_of_the_day(&self) -> Result<DailyQuote, QuotesError> {
            match &self.0 {
                None => Ok(DailyQuote {
                    quote: "Stay hungry.".into(),
                    author: "Someone".into(),
                    title: "Inspiring Quote of the day".into(),
                }),
                Some(QuotesError::RateLimited(m)) => Err(QuotesError::RateLimited(m.clone())),
                Some(_) => Err(QuotesError::ConnectionFailed("refused".into())),
            }
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(9, 15, 10)
            .unwrap()
    }

    #[tokio::test]
    async fn quote_is_stamped_with_now() {
        let adapter = QuotesAdapter::new(Box::new(FakeClient(None)));
        let quote = adapter.quote_of_the_day(now()).await.unwrap();
        assert_eq!(quote.quote, "Stay hungry.");
        assert_eq!(quote.datetime, now());
    }

    #[tokio::test]
    async fn rate_limit_keeps_service_message() {
        let adapter = QuotesAdapter::new(Box::new(FakeClient(Some(QuotesError::RateLimited(
            "Too Many Requests: Rate limit of 10 requests per hour exceeded".into(),
        )))));
        let err = adapter.quote_of_the_day(now()).await.unwrap_err();
        match err {
            ApplicationError::RateLimited(message) => assert!(message.contains("10 requests")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn connection_errors_are_retryable() {
        let adapter = QuotesAdapter::new(Box::new(FakeClient(Some(QuotesError::ConnectionFailed(
            String::new(),
        )))));
        assert!(adapter.quote_of_the_day(now()).await.unwrap_err().is_retryable());
    }
}
