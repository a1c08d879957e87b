//! Quote of the day collector

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use domain::entities::Quote;
use tracing::{info, instrument};

use super::db_manager::DbManager;
use super::polling::Collector;
use crate::error::ApplicationError;
use crate::ports::{FetchQuery, Filter, FilterOp, QuotePort};

/// `datetime >= day 00:00 AND datetime < next day 00:00`
#[must_use]
pub fn same_day(column: &str, day: NaiveDate) -> [Filter; 2] {
    let start = day.and_time(NaiveTime::MIN);
    [
        Filter::new(column, FilterOp::Gte, start),
        Filter::new(column, FilterOp::Lt, start + Duration::days(1)),
    ]
}

pub struct QuoteService {
    quotes: Arc<dyn QuotePort>,
    db: Arc<DbManager>,
}

impl std::fmt::Debug for QuoteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteService").finish_non_exhaustive()
    }
}

impl QuoteService {
    pub const APP: &'static str = "quote_mgr";

    pub fn new(quotes: Arc<dyn QuotePort>, db: Arc<DbManager>) -> Self {
        Self { quotes, db }
    }

    /// Store `quote` unless the same text was already stored on its day
    pub async fn store_if_new(&self, quote: &Quote) -> Result<bool, ApplicationError> {
        let [from, until] = same_day("datetime", quote.datetime.date());
        let existing = self
            .db
            .fetch_one(
                Quote::TABLE,
                FetchQuery::all()
                    .where_eq("quote", quote.quote.as_str())
                    .filter(from)
                    .filter(until),
            )
            .await?;
        if existing.is_some() {
            info!("Quote already stored for today");
            return Ok(false);
        }
        self.db
            .insert_data(Quote::TABLE, vec![quote.to_record()])
            .await?;
        Ok(true)
    }
}

#[async_trait]
impl Collector for QuoteService {
    fn name(&self) -> &str {
        Self::APP
    }

    #[instrument(skip(self))]
    async fn collect(&self, now: NaiveDateTime) -> Result<(), ApplicationError> {
        let quote = self.quotes.quote_of_the_day(now).await?;
        info!(author = %quote.author, title = %quote.title, "Fetched quote");
        self.store_if_new(&quote).await?;
        Ok(())
    }
}
