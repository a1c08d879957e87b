//! Quote of the day integration
//!
//! Client for the quotes.rest quote-of-the-day endpoint.

pub mod client;

pub use client::{DailyQuote, QuotesClient, QuotesConfig, QuotesError, QuotesHttpClient};
