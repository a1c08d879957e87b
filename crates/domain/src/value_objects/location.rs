//! Sensor node locations and their comfort thresholds

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::DomainError;

/// Inclusive-critical range: a value at or beyond either bound is critical
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// `true` when `value <= min` or `value >= max`
    #[must_use]
    pub fn is_critical(&self, value: f64) -> bool {
        value <= self.min || value >= self.max
    }
}

/// Temperature (°F) and relative humidity (%) limits for a location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub temperature: Range,
    pub humidity: Range,
}

/// Where a sensor node is installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Upstairs,
    Downstairs,
    Attic,
}

impl Location {
    pub const ALL: [Self; 3] = [Self::Upstairs, Self::Downstairs, Self::Attic];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Upstairs => "upstairs",
            Self::Downstairs => "downstairs",
            Self::Attic => "attic",
        }
    }

    /// Capitalized name used in alerts and dashboards
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Upstairs => "Upstairs",
            Self::Downstairs => "Downstairs",
            Self::Attic => "Attic",
        }
    }

    #[must_use]
    pub const fn thresholds(&self) -> Thresholds {
        match self {
            Self::Attic => Thresholds {
                temperature: Range::new(30.0, 90.0),
                humidity: Range::new(30.0, 70.0),
            },
            Self::Upstairs | Self::Downstairs => Thresholds {
                temperature: Range::new(60.0, 80.0),
                humidity: Range::new(35.0, 60.0),
            },
        }
    }

    /// Font Awesome class for the dashboard tile
    #[must_use]
    pub const fn icon_class(&self) -> &'static str {
        match self {
            Self::Upstairs => "fas fa-sort-amount-up-alt fa-7x",
            Self::Downstairs => "fas fa-sort-amount-down-alt fa-7x",
            Self::Attic => "fas fa-igloo fa-7x",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "upstairs" => Ok(Self::Upstairs),
            "downstairs" => Ok(Self::Downstairs),
            "attic" => Ok(Self::Attic),
            other => Err(DomainError::InvalidLocation(other.to_string())),
        }
    }
}

/// Convert a Celsius reading to Fahrenheit
#[must_use]
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius.mul_add(9.0 / 5.0, 32.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_critical() {
        let t = Location::Upstairs.thresholds();
        assert!(t.temperature.is_critical(60.0));
        assert!(t.temperature.is_critical(80.0));
        assert!(!t.temperature.is_critical(70.0));
        assert!(t.humidity.is_critical(61.0));
    }

    #[test]
    fn attic_is_more_tolerant() {
        let t = Location::Attic.thresholds();
        assert!(!t.temperature.is_critical(85.0));
        assert!(t.temperature.is_critical(90.0));
        assert!(!t.humidity.is_critical(65.0));
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Attic".parse::<Location>().unwrap(), Location::Attic);
        assert_eq!(" downstairs ".parse::<Location>().unwrap(), Location::Downstairs);
        assert!("garage".parse::<Location>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for loc in Location::ALL {
            assert_eq!(loc.to_string().parse::<Location>().unwrap(), loc);
        }
    }

    #[test]
    fn converts_celsius() {
        assert!((celsius_to_fahrenheit(0.0) - 32.0).abs() < 1e-9);
        assert!((celsius_to_fahrenheit(100.0) - 212.0).abs() < 1e-9);
        assert!((celsius_to_fahrenheit(21.5) - 70.7).abs() < 1e-9);
    }
}
