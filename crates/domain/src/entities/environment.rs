//! Environment reading from a temperature/humidity sensor node

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{Location, Record, truncate_to_minute};

/// One temperature/humidity sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentReading {
    /// Minute the sample belongs to
    pub datetime: NaiveDateTime,
    /// Degrees Fahrenheit
    pub temperature: f64,
    /// Relative humidity, percent
    pub humidity: f64,
    pub location: Location,
}

impl EnvironmentReading {
    pub const TABLE: &'static str = "environment";

    /// Build a reading; the timestamp is truncated to the minute
    #[must_use]
    pub fn new(
        datetime: NaiveDateTime,
        temperature: f64,
        humidity: f64,
        location: Location,
    ) -> Self {
        Self {
            datetime: truncate_to_minute(datetime),
            temperature,
            humidity,
            location,
        }
    }

    #[must_use]
    pub fn temperature_critical(&self) -> bool {
        self.location
            .thresholds()
            .temperature
            .is_critical(self.temperature)
    }

    #[must_use]
    pub fn humidity_critical(&self) -> bool {
        self.location.thresholds().humidity.is_critical(self.humidity)
    }

    #[must_use]
    pub fn to_record(&self) -> Record {
        Record::new()
            .with("datetime", self.datetime)
            .with("temperature", self.temperature)
            .with("humidity", self.humidity)
            .with("location", self.location.as_str())
    }

    pub fn from_record(record: &Record) -> Result<Self, DomainError> {
        Ok(Self {
            datetime: record.timestamp("datetime")?,
            temperature: record.float("temperature")?,
            humidity: record.float("humidity")?,
            location: record.text("location")?.parse()?,
        })
    }
}
