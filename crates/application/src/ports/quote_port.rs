//! Quote of the day port

use async_trait::async_trait;
use chrono::NaiveDateTime;
use domain::entities::Quote;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait QuotePort: Send + Sync {
    /// Fetch today's quote, stamped with `now`
    async fn quote_of_the_day(&self, now: NaiveDateTime) -> Result<Quote, ApplicationError>;
}
