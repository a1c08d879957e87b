//! Application state shared across handlers

use std::sync::Arc;

use application::{DashboardService, WeatherService};
use chrono::{DateTime, Local, NaiveDateTime, Utc};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Read models over the node databases
    pub dashboard: Arc<DashboardService>,
    /// Cached weather and location lookups
    pub weather: Arc<WeatherService>,
    /// Source of "now" for staleness checks and the header clock
    pub clock: fn() -> NaiveDateTime,
    /// Source of "now" for weather caching and day/night
    pub utc_clock: fn() -> DateTime<Utc>,
}

impl AppState {
    /// State reading the system clock
    pub fn new(dashboard: Arc<DashboardService>, weather: Arc<WeatherService>) -> Self {
        Self {
            dashboard,
            weather,
            clock: local_now,
            utc_clock: Utc::now,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_utc_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.utc_clock = clock;
        self
    }

    pub fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    pub fn utc_now(&self) -> DateTime<Utc> {
        (self.utc_clock)()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("dashboard", &self.dashboard)
            .field("weather", &self.weather)
            .finish_non_exhaustive()
    }
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}
