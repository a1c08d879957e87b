//! Quote of the day

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::Record;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub quote: String,
    pub author: String,
    pub title: String,
    /// When the quote was fetched
    pub datetime: NaiveDateTime,
}

impl Quote {
    pub const TABLE: &'static str = "qotd";

    #[must_use]
    pub fn to_record(&self) -> Record {
        Record::new()
            .with("quote", self.quote.as_str())
            .with("author", self.author.as_str())
            .with("title", self.title.as_str())
            .with("datetime", self.datetime)
    }

    pub fn from_record(record: &Record) -> Result<Self, DomainError> {
        Ok(Self {
            quote: record.text("quote")?,
            author: record.text("author")?,
            title: record.text("title")?,
            datetime: record.timestamp("datetime")?,
        })
    }
}
