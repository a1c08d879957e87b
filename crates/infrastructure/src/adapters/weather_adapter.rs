//! Weather adapters - Implement WeatherPort and LocationPort using integration_weather
//!
//! Keys are read from the vault on every lookup; the service in front of
//! these adapters caches results, so that happens at most once per refresh.

use std::sync::Arc;

use application::ApplicationError;
use application::ports::{LocationPort, SecretStoreExt, SecretStorePort, WeatherPort};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::DomainError;
use domain::entities::{DayForecast, GeoLocation, WeatherReport};
use integration_weather::{
    IpDetails, IpinfoClient, IpinfoCredentials, LocationClient, LocationConfig, OneCall,
    OpenWeatherClient, OpenWeatherCredentials, WeatherClient, WeatherConfig, WeatherError,
    WeatherTag, icon_url,
};
use tracing::{debug, instrument};

/// Vault path of the One Call key
pub const OPENWEATHERMAP_SECRET: &str = "sensor/openweathermap";
/// Vault path of the ipinfo token
pub const IPINFO_SECRET: &str = "sensor/ipinfo";

fn map_error(err: WeatherError) -> ApplicationError {
    match err {
        WeatherError::ConnectionFailed(e) | WeatherError::RequestFailed(e) => {
            ApplicationError::ExternalService(e)
        },
        WeatherError::ParseError(e) => {
            ApplicationError::ExternalService(format!("Unexpected weather response: {e}"))
        },
        WeatherError::Unauthorized(e) => ApplicationError::Configuration(e),
        WeatherError::InvalidCoordinates => {
            DomainError::ValidationError(WeatherError::InvalidCoordinates.to_string()).into()
        },
        WeatherError::RateLimitExceeded => {
            ApplicationError::RateLimited("Weather request quota used up".into())
        },
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, ApplicationError> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        ApplicationError::ExternalService(format!("Weather timestamp out of range: {secs}"))
    })
}

/// Group, description and icon code, or placeholders when the API sent none
fn describe(tag: Option<&WeatherTag>) -> (String, String, &str) {
    tag.map_or_else(
        || ("unknown".to_string(), "unknown".to_string(), ""),
        |t| (t.main.clone(), t.description.clone(), t.icon.as_str()),
    )
}

/// Adapter for the OpenWeatherMap One Call API
pub struct OpenWeatherAdapter {
    client: Box<dyn WeatherClient>,
    secrets: Arc<dyn SecretStorePort>,
}

impl std::fmt::Debug for OpenWeatherAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherAdapter")
            .field("client", &"WeatherClient")
            .finish_non_exhaustive()
    }
}

impl OpenWeatherAdapter {
    pub fn new(client: Box<dyn WeatherClient>, secrets: Arc<dyn SecretStorePort>) -> Self {
        Self { client, secrets }
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to initialize.
    pub fn with_config(
        config: WeatherConfig,
        secrets: Arc<dyn SecretStorePort>,
    ) -> Result<Self, ApplicationError> {
        let client =
            OpenWeatherClient::new(config).map_err(|e| ApplicationError::Internal(e.to_string()))?;
        Ok(Self::new(Box::new(client), secrets))
    }

    fn map_report(call: &OneCall) -> Result<WeatherReport, ApplicationError> {
        let current = &call.current;
        let (status, detailed_status, icon) = describe(current.primary());
        let forecast = call
            .daily
            .iter()
            .map(|day| {
                let (status, _, icon) = describe(day.primary());
                Ok(DayForecast {
                    date: timestamp(day.dt)?,
                    temp_min: day.temp.min,
                    temp_max: day.temp.max,
                    status,
                    icon_url: icon_url(icon, false),
                })
            })
            .collect::<Result<Vec<_>, ApplicationError>>()?;

        Ok(WeatherReport {
            observed_at: timestamp(current.dt)?,
            sunrise: current.sunrise.map(timestamp).transpose()?,
            sunset: current.sunset.map(timestamp).transpose()?,
            temperature: current.temp,
            status,
            detailed_status,
            icon_url: icon_url(icon, true),
            utc_offset_secs: call.timezone_offset,
            forecast,
        })
    }
}

#[async_trait]
impl WeatherPort for OpenWeatherAdapter {
    #[instrument(skip(self))]
    async fn report(&self, latitude: f64, longitude: f64) -> Result<WeatherReport, ApplicationError> {
        let credentials: OpenWeatherCredentials =
            self.secrets.get_typed(OPENWEATHERMAP_SECRET).await?;
        let call = self
            .client
            .one_call(&credentials, latitude, longitude)
            .await
            .map_err(map_error)?;
        debug!(days = call.daily.len(), "Weather received");
        Self::map_report(&call)
    }
}

/// Adapter for the ipinfo.io lookup
pub struct IpinfoAdapter {
    client: Box<dyn LocationClient>,
    secrets: Arc<dyn SecretStorePort>,
}

impl std::fmt::Debug for IpinfoAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpinfoAdapter")
            .field("client", &"LocationClient")
            .finish_non_exhaustive()
    }
}

impl IpinfoAdapter {
    pub fn new(client: Box<dyn LocationClient>, secrets: Arc<dyn SecretStorePort>) -> Self {
        Self { client, secrets }
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to initialize.
    pub fn with_config(
        config: LocationConfig,
        secrets: Arc<dyn SecretStorePort>,
    ) -> Result<Self, ApplicationError> {
        let client =
            IpinfoClient::new(config).map_err(|e| ApplicationError::Internal(e.to_string()))?;
        Ok(Self::new(Box::new(client), secrets))
    }

    fn map_details(details: IpDetails) -> GeoLocation {
        let (latitude, longitude) = details.coordinates().unzip();
        GeoLocation {
            ip: details.ip,
            hostname: details.hostname,
            city: details.city,
            region: details.region,
            country: details.country,
            loc: details.loc,
            latitude,
            longitude,
            org: details.org,
            postal: details.postal,
            timezone: details.timezone,
        }
    }
}

#[async_trait]
impl LocationPort for IpinfoAdapter {
    #[instrument(skip(self))]
    async fn locate(&self) -> Result<GeoLocation, ApplicationError> {
        let credentials: IpinfoCredentials = self.secrets.get_typed(IPINFO_SECRET).await?;
        let details = self
            .client
            .own_details(&credentials)
            .await
            .map_err(map_error)?;
        debug!(city = ?details.city, "Location received");
        Ok(Self::map_details(details))
    }
}
