//! Instantaneous power flow between grid, panels, battery and load

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{Record, truncate_to_minute};

/// Snapshot of the site's current power flow (kW)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerFlow {
    pub datetime: NaiveDateTime,
    pub grid_status: String,
    pub grid_power: f64,
    pub solar_status: String,
    pub solar_power: f64,
    pub battery_status: String,
    pub battery_power: f64,
    pub battery_charge: f64,
    pub battery_critical: bool,
    pub power_usage: f64,
}

impl PowerFlow {
    pub const TABLE: &'static str = "power";

    /// Status columns watched for transitions
    pub const STATUS_COLUMNS: [&'static str; 3] = ["solar_status", "battery_status", "grid_status"];

    #[must_use]
    pub fn with_datetime(mut self, datetime: NaiveDateTime) -> Self {
        self.datetime = truncate_to_minute(datetime);
        self
    }

    /// Value of a status column by name
    #[must_use]
    pub fn status(&self, column: &str) -> Option<&str> {
        match column {
            "solar_status" => Some(&self.solar_status),
            "battery_status" => Some(&self.battery_status),
            "grid_status" => Some(&self.grid_status),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_record(&self) -> Record {
        Record::new()
            .with("datetime", self.datetime)
            .with("grid_status", self.grid_status.as_str())
            .with("grid_power", self.grid_power)
            .with("solar_status", self.solar_status.as_str())
            .with("solar_power", self.solar_power)
            .with("battery_status", self.battery_status.as_str())
            .with("battery_power", self.battery_power)
            .with("battery_charge", self.battery_charge)
            .with("battery_critical", self.battery_critical)
            .with("power_usage", self.power_usage)
    }

    pub fn from_record(record: &Record) -> Result<Self, DomainError> {
        Ok(Self {
            datetime: record.timestamp("datetime")?,
            grid_status: record.text("grid_status")?,
            grid_power: record.float("grid_power")?,
            solar_status: record.text("solar_status")?,
            solar_power: record.float("solar_power")?,
            battery_status: record.text("battery_status")?,
            battery_power: record.float("battery_power")?,
            battery_charge: record.float("battery_charge")?,
            battery_critical: record.boolean("battery_critical")?,
            power_usage: record.float("power_usage")?,
        })
    }
}
