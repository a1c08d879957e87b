//! Weather and location for the dashboard header panels
//!
//! Unlike the other entities these are never stored; they are fetched from
//! the web and held in memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current conditions plus the daily outlook at one point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub observed_at: DateTime<Utc>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub temperature: f64,
    /// Condition group, e.g. `rain`
    pub status: String,
    /// e.g. `light rain`
    pub detailed_status: String,
    pub icon_url: String,
    /// Offset of the location's local time from UTC
    pub utc_offset_secs: i32,
    /// Today first
    pub forecast: Vec<DayForecast>,
}

impl WeatherReport {
    /// Between sunrise and sunset, inclusive; false when either is unknown
    #[must_use]
    pub fn is_daylight(&self, now: DateTime<Utc>) -> bool {
        match (self.sunrise, self.sunset) {
            (Some(rise), Some(set)) => rise <= now && now <= set,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    pub date: DateTime<Utc>,
    pub temp_min: f64,
    pub temp_max: f64,
    pub status: String,
    pub icon_url: String,
}

/// Where the house's public address resolves to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    /// `"lat,lon"` as reported
    pub loc: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub org: Option<String>,
    pub postal: Option<String>,
    pub timezone: Option<String>,
}
