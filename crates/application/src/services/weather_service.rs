//! Weather and location panels
//!
//! Both lookups hit rate-limited web APIs, so results are kept for
//! [`WEATHER_REFRESH_MINUTES`] and shared by every dashboard client. The
//! day/night background is decided per request from the cached sun times.

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use domain::DomainError;
use domain::entities::{GeoLocation, WeatherReport};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::ApplicationError;
use crate::ports::{LocationPort, WeatherPort};

/// Lookups are reused for this long
pub const WEATHER_REFRESH_MINUTES: i64 = 30;
/// Days shown in the forecast strip
pub const FORECAST_DAYS: usize = 5;
/// Panel background while the sun is up
pub const DAY_BACKGROUND: &str = "w3-blue";
/// Panel background otherwise
pub const NIGHT_BACKGROUND: &str = "w3-gray";

const DAY_LABEL_FORMAT: &str = "%a\n%m/%d";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastView {
    /// Weekday over month/day, in the location's local time
    pub day: String,
    pub temp_min: i64,
    pub temp_max: i64,
    pub status: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherView {
    pub temp: f64,
    pub icon: String,
    pub detailed_status: String,
    pub status: String,
    pub forecast: Vec<ForecastView>,
    pub bg_color: &'static str,
}

/// Upper-case the first letter of every word, lower-case the rest
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word_start = true;
    for c in text.chars() {
        if word_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        word_start = !c.is_alphabetic();
    }
    out
}

/// Nearest whole degree, ties to even
#[allow(clippy::cast_possible_truncation)]
fn whole_degrees(value: f64) -> i64 {
    value.round_ties_even() as i64
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), DomainError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(DomainError::ValidationError(format!(
            "latitude {latitude} is outside -90..=90"
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(DomainError::ValidationError(format!(
            "longitude {longitude} is outside -180..=180"
        )));
    }
    Ok(())
}

impl WeatherView {
    /// Render `report` for the panel as of `now`
    #[must_use]
    pub fn render(report: &WeatherReport, now: DateTime<Utc>) -> Self {
        let offset = FixedOffset::east_opt(report.utc_offset_secs).unwrap_or_else(|| Utc.fix());
        let forecast = report
            .forecast
            .iter()
            .take(FORECAST_DAYS)
            .map(|day| ForecastView {
                day: day
                    .date
                    .with_timezone(&offset)
                    .format(DAY_LABEL_FORMAT)
                    .to_string(),
                temp_min: whole_degrees(day.temp_min),
                temp_max: whole_degrees(day.temp_max),
                status: title_case(&day.status),
                icon: day.icon_url.clone(),
            })
            .collect();

        Self {
            temp: report.temperature,
            icon: report.icon_url.clone(),
            detailed_status: title_case(&report.detailed_status),
            status: title_case(&report.status),
            forecast,
            bg_color: if report.is_daylight(now) {
                DAY_BACKGROUND
            } else {
                NIGHT_BACKGROUND
            },
        }
    }
}

struct CachedWeather {
    fetched_at: DateTime<Utc>,
    /// Bit patterns of the requested latitude and longitude
    point: (u64, u64),
    report: WeatherReport,
}

struct CachedLocation {
    fetched_at: DateTime<Utc>,
    location: GeoLocation,
}

pub struct WeatherService {
    weather: Arc<dyn WeatherPort>,
    location: Arc<dyn LocationPort>,
    refresh: Duration,
    weather_cache: Mutex<Option<CachedWeather>>,
    location_cache: Mutex<Option<CachedLocation>>,
}

impl std::fmt::Debug for WeatherService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherService")
            .field("refresh", &self.refresh)
            .finish_non_exhaustive()
    }
}

impl WeatherService {
    pub fn new(weather: Arc<dyn WeatherPort>, location: Arc<dyn LocationPort>) -> Self {
        Self {
            weather,
            location,
            refresh: Duration::minutes(WEATHER_REFRESH_MINUTES),
            weather_cache: Mutex::new(None),
            location_cache: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_refresh(mut self, refresh: Duration) -> Self {
        self.refresh = refresh;
        self
    }

    fn is_fresh(&self, fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now < fetched_at + self.refresh
    }

    /// Weather panel for a point; refetched when the point changes or the
    /// cached report is older than the refresh interval
    #[instrument(skip(self))]
    pub async fn weather(
        &self,
        latitude: f64,
        longitude: f64,
        now: DateTime<Utc>,
    ) -> Result<WeatherView, ApplicationError> {
        validate_coordinates(latitude, longitude)?;
        let point = (latitude.to_bits(), longitude.to_bits());

        let cached = self
            .weather_cache
            .lock()
            .as_ref()
            .filter(|c| c.point == point && self.is_fresh(c.fetched_at, now))
            .map(|c| c.report.clone());
        if let Some(report) = cached {
            debug!("Using cached weather");
            return Ok(WeatherView::render(&report, now));
        }

        info!("Fetching new weather");
        let report = self.weather.report(latitude, longitude).await?;
        let view = WeatherView::render(&report, now);
        *self.weather_cache.lock() = Some(CachedWeather {
            fetched_at: now,
            point,
            report,
        });
        Ok(view)
    }

    /// Location panel
    #[instrument(skip(self))]
    pub async fn location(&self, now: DateTime<Utc>) -> Result<GeoLocation, ApplicationError> {
        let cached = self
            .location_cache
            .lock()
            .as_ref()
            .filter(|c| self.is_fresh(c.fetched_at, now))
            .map(|c| c.location.clone());
        if let Some(location) = cached {
            debug!("Using cached location");
            return Ok(location);
        }

        info!("Fetching new location");
        let location = self.location.locate().await?;
        *self.location_cache.lock() = Some(CachedLocation {
            fetched_at: now,
            location: location.clone(),
        });
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{MockLocationPort, MockWeatherPort};
    use domain::entities::DayForecast;

    /// 2024-06-01 17:00:00 UTC, noon in Chicago
    const NOON_CDT: i64 = 1_717_261_200;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn sample_report() -> WeatherReport {
        WeatherReport {
            observed_at: ts(NOON_CDT),
            sunrise: Some(ts(NOON_CDT - 6 * 3600)),
            sunset: Some(ts(NOON_CDT + 8 * 3600)),
            temperature: 71.6,
            status: "rain".into(),
            detailed_status: "light rain".into(),
            icon_url: "https://openweathermap.org/img/wn/10d@2x.png".into(),
            utc_offset_secs: -5 * 3600,
            forecast: (0..7)
                .map(|day| DayForecast {
                    date: ts(NOON_CDT + day * 86_400),
                    temp_min: 58.5,
                    temp_max: 77.6,
                    status: "clouds".into(),
                    icon_url: "https://openweathermap.org/img/wn/04d.png".into(),
                })
                .collect(),
        }
    }

    fn location() -> GeoLocation {
        GeoLocation {
            ip: "203.0.113.7".into(),
            city: Some("Chicago".into()),
            latitude: Some(41.85),
            longitude: Some(-87.65),
            ..GeoLocation::default()
        }
    }

    fn service(weather: MockWeatherPort, location: MockLocationPort) -> WeatherService {
        WeatherService::new(Arc::new(weather), Arc::new(location))
    }

    #[test]
    fn title_case_matches_display_style() {
        assert_eq!(title_case("light rain"), "Light Rain");
        assert_eq!(title_case("CLEAR sky"), "Clear Sky");
        assert_eq!(title_case("thunderstorm with heavy-drizzle"), "Thunderstorm With Heavy-Drizzle");
    }

    #[test]
    fn degrees_round_half_to_even() {
        assert_eq!(whole_degrees(58.5), 58);
        assert_eq!(whole_degrees(59.5), 60);
        assert_eq!(whole_degrees(77.6), 78);
        assert_eq!(whole_degrees(-0.4), 0);
    }

    #[test]
    fn render_formats_forecast_in_local_time() {
        let view = WeatherView::render(&sample_report(), ts(NOON_CDT));
        assert_eq!(view.status, "Rain");
        assert_eq!(view.detailed_status, "Light Rain");
        assert_eq!(view.forecast.len(), FORECAST_DAYS);
        assert_eq!(view.forecast[0].day, "Sat\n06/01");
        assert_eq!(view.forecast[1].day, "Sun\n06/02");
        assert_eq!(view.forecast[0].temp_min, 58);
        assert_eq!(view.forecast[0].temp_max, 78);
        assert_eq!(view.forecast[0].status, "Clouds");
    }

    #[test]
    fn background_follows_the_sun() {
        let report = sample_report();
        assert_eq!(WeatherView::render(&report, ts(NOON_CDT)).bg_color, DAY_BACKGROUND);
        assert_eq!(
            WeatherView::render(&report, ts(NOON_CDT + 10 * 3600)).bg_color,
            NIGHT_BACKGROUND
        );
    }

    #[tokio::test]
    async fn weather_is_cached_for_the_refresh_interval() {
        let mut weather = MockWeatherPort::new();
        weather
            .expect_report()
            .times(2)
            .returning(|_, _| Ok(sample_report()));
        let svc = service(weather, MockLocationPort::new());

        svc.weather(41.85, -87.65, ts(NOON_CDT)).await.unwrap();
        svc.weather(41.85, -87.65, ts(NOON_CDT + 29 * 60)).await.unwrap();
        svc.weather(41.85, -87.65, ts(NOON_CDT + 30 * 60)).await.unwrap();
    }

    #[tokio::test]
    async fn cached_weather_recomputes_background() {
        let mut weather = MockWeatherPort::new();
        weather
            .expect_report()
            .times(1)
            .returning(|_, _| Ok(sample_report()));
        let svc = service(weather, MockLocationPort::new());

        let sunset = NOON_CDT + 8 * 3600;
        let before = svc.weather(41.85, -87.65, ts(sunset - 60)).await.unwrap();
        let after = svc.weather(41.85, -87.65, ts(sunset + 60)).await.unwrap();
        assert_eq!(before.bg_color, DAY_BACKGROUND);
        assert_eq!(after.bg_color, NIGHT_BACKGROUND);
    }

    #[tokio::test]
    async fn moving_the_point_refetches() {
        let mut weather = MockWeatherPort::new();
        weather
            .expect_report()
            .times(2)
            .returning(|_, _| Ok(sample_report()));
        let svc = service(weather, MockLocationPort::new());

        svc.weather(41.85, -87.65, ts(NOON_CDT)).await.unwrap();
        svc.weather(40.71, -74.0, ts(NOON_CDT + 60)).await.unwrap();
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let mut weather = MockWeatherPort::new();
        let mut calls = 0;
        weather.expect_report().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Err(ApplicationError::ExternalService("timeout".into()))
            } else {
                Ok(sample_report())
            }
        });
        let svc = service(weather, MockLocationPort::new());

        assert!(svc.weather(41.85, -87.65, ts(NOON_CDT)).await.is_err());
        assert!(svc.weather(41.85, -87.65, ts(NOON_CDT + 60)).await.is_ok());
    }

    #[tokio::test]
    async fn out_of_range_point_is_rejected_without_lookup() {
        let mut weather = MockWeatherPort::new();
        weather.expect_report().never();
        let svc = service(weather, MockLocationPort::new());

        for (lat, lon) in [(91.0, 0.0), (0.0, 181.0), (f64::NAN, 0.0)] {
            let err = svc.weather(lat, lon, ts(NOON_CDT)).await.unwrap_err();
            assert!(
                matches!(err, ApplicationError::Domain(DomainError::ValidationError(_))),
                "{err}"
            );
        }
    }

    #[tokio::test]
    async fn location_is_cached_for_the_refresh_interval() {
        let mut port = MockLocationPort::new();
        port.expect_locate().times(2).returning(|| Ok(location()));
        let svc = service(MockWeatherPort::new(), port);

        assert_eq!(svc.location(ts(NOON_CDT)).await.unwrap().city.as_deref(), Some("Chicago"));
        svc.location(ts(NOON_CDT + 10 * 60)).await.unwrap();
        svc.location(ts(NOON_CDT + 31 * 60)).await.unwrap();
    }

    #[tokio::test]
    async fn refresh_interval_is_configurable() {
        let mut port = MockLocationPort::new();
        port.expect_locate().times(2).returning(|| Ok(location()));
        let svc = service(MockWeatherPort::new(), port).with_refresh(Duration::minutes(5));

        svc.location(ts(NOON_CDT)).await.unwrap();
        svc.location(ts(NOON_CDT + 5 * 60)).await.unwrap();
    }
}
