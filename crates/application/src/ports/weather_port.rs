//! Weather and location lookup ports

use async_trait::async_trait;
use domain::entities::{GeoLocation, WeatherReport};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait WeatherPort: Send + Sync {
    /// Current conditions and the daily forecast at a point
    async fn report(&self, latitude: f64, longitude: f64) -> Result<WeatherReport, ApplicationError>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait LocationPort: Send + Sync {
    /// Geolocation of the house's public address
    async fn locate(&self) -> Result<GeoLocation, ApplicationError>;
}
