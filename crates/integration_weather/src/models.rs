//! Response models for OpenWeatherMap and ipinfo

use serde::{Deserialize, Serialize};

/// One Call response, trimmed to the current and daily blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneCall {
    /// Shift from UTC of the requested location, in seconds
    #[serde(default)]
    pub timezone_offset: i32,
    pub current: Conditions,
    #[serde(default)]
    pub daily: Vec<DailyOutlook>,
}

/// Current conditions; times are unix seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    pub dt: i64,
    /// Absent during polar day and night
    #[serde(default)]
    pub sunrise: Option<i64>,
    #[serde(default)]
    pub sunset: Option<i64>,
    pub temp: f64,
    #[serde(default)]
    pub weather: Vec<WeatherTag>,
}

impl Conditions {
    #[must_use]
    pub fn primary(&self) -> Option<&WeatherTag> {
        self.weather.first()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherTag {
    pub id: u32,
    /// Group name, e.g. `Rain`
    pub main: String,
    /// e.g. `light rain`
    pub description: String,
    /// Icon code, e.g. `10d`
    pub icon: String,
}

/// One day of the daily forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyOutlook {
    /// Noon of the day, unix seconds
    pub dt: i64,
    pub temp: TempRange,
    #[serde(default)]
    pub weather: Vec<WeatherTag>,
}

impl DailyOutlook {
    #[must_use]
    pub fn primary(&self) -> Option<&WeatherTag> {
        self.weather.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempRange {
    pub min: f64,
    pub max: f64,
}

/// ipinfo.io details for the caller's public address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpDetails {
    pub ip: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    /// `"lat,lon"`
    #[serde(default)]
    pub loc: Option<String>,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub postal: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl IpDetails {
    /// Latitude and longitude parsed from `loc`
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let (lat, lon) = self.loc.as_deref()?.split_once(',')?;
        Some((lat.trim().parse().ok()?, lon.trim().parse().ok()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_call_tolerates_missing_optional_blocks() {
        let call: OneCall = serde_json::from_str(
            r#"{"current": {"dt": 1717243200, "temp": 71.2, "weather": []}}"#,
        )
        .unwrap();
        assert_eq!(call.timezone_offset, 0);
        assert!(call.daily.is_empty());
        assert!(call.current.sunrise.is_none());
        assert!(call.current.primary().is_none());
    }

    #[test]
    fn coordinates_from_loc() {
        let details = IpDetails {
            ip: "203.0.113.7".into(),
            loc: Some("41.8500,-87.6500".into()),
            ..IpDetails::default()
        };
        assert_eq!(details.coordinates(), Some((41.85, -87.65)));
    }

    #[test]
    fn malformed_loc_has_no_coordinates() {
        for loc in [None, Some("41.85"), Some("north,west")] {
            let details = IpDetails {
                ip: "203.0.113.7".into(),
                loc: loc.map(str::to_string),
                ..IpDetails::default()
            };
            assert_eq!(details.coordinates(), None, "{loc:?}");
        }
    }
}
