//! SolarEdge adapter - Implements SolarPort using integration_solaredge

use application::ApplicationError;
use application::ports::SolarPort;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use domain::{EnergyReading, PowerFlow, truncate_to_minute};
use integration_solaredge::{
    CurrentPowerFlow, EnergyDetails, SolarEdgeClient, SolarEdgeConfig, SolarEdgeCredentials,
    SolarEdgeError, SolarEdgeHttpClient,
};
use tracing::{debug, instrument, warn};

use crate::telemetry::log_fields;

/// Adapter for the SolarEdge monitoring API
pub struct SolarEdgeAdapter {
    client: Box<dyn SolarEdgeClient>,
}

impl std::fmt::Debug for SolarEdgeAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolarEdgeAdapter")
            .field("client", &"SolarEdgeClient")
            .finish()
    }
}

impl SolarEdgeAdapter {
    pub fn new(client: Box<dyn SolarEdgeClient>) -> Self {
        Self { client }
    }

    /// Create with the reqwest client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to initialize.
    pub fn with_config(
        config: SolarEdgeConfig,
        credentials: SolarEdgeCredentials,
    ) -> Result<Self, ApplicationError> {
        let client = SolarEdgeHttpClient::new(config, credentials)
            .map_err(|e| ApplicationError::Internal(e.to_string()))?;
        Ok(Self::new(Box::new(client)))
    }

    fn map_error(err: SolarEdgeError) -> ApplicationError {
        match err {
            SolarEdgeError::ConnectionFailed(e)
            | SolarEdgeError::RequestFailed(e)
            | SolarEdgeError::ServiceUnavailable(e) => ApplicationError::ExternalService(e),
            SolarEdgeError::ParseError(e) => {
                ApplicationError::ExternalService(format!("Unexpected SolarEdge response: {e}"))
            },
            SolarEdgeError::Unauthorized(e) => ApplicationError::Configuration(e),
            SolarEdgeError::RateLimitExceeded => {
                ApplicationError::RateLimited("SolarEdge daily request quota used up".into())
            },
        }
    }

    /// Meter totals keyed by `date`; unknown meters are skipped
    fn map_energy(details: &EnergyDetails, start: NaiveDateTime) -> EnergyReading {
        let mut reading = EnergyReading::new(start.date());
        for meter in &details.meters {
            match meter.meter.column() {
                Some(column) => {
                    reading.set_meter(column, meter.value);
                },
                None => warn!(meter = ?meter.meter, "Skipping unknown meter"),
            }
        }
        reading
    }

    fn map_power(flow: &CurrentPowerFlow, now: NaiveDateTime) -> PowerFlow {
        PowerFlow {
            datetime: truncate_to_minute(now),
            grid_status: flow.grid.status.clone(),
            grid_power: flow.grid.current_power,
            solar_status: flow.pv.status.clone(),
            solar_power: flow.pv.current_power,
            battery_status: flow.storage.status.clone(),
            battery_power: flow.storage.current_power,
            battery_charge: flow.storage.charge_level,
            battery_critical: flow.storage.critical,
            power_usage: flow.load.current_power,
        }
    }
}

#[async_trait]
impl SolarPort for SolarEdgeAdapter {
    #[instrument(skip(self))]
    async fn energy_details(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<EnergyReading, ApplicationError> {
        let details = self
            .client
            .energy_details(start, end)
            .await
            .map_err(Self::map_error)?;
        debug!(meters = details.meters.len(), unit = ?details.unit, "Energy details received");

        let reading = Self::map_energy(&details, start);
        log_fields(&[
            ("date", reading.date.to_string()),
            ("import", reading.import.to_string()),
            ("export", reading.export.to_string()),
            ("consumption", reading.consumption.to_string()),
            ("self_consumption", reading.self_consumption.to_string()),
            ("production", reading.production.to_string()),
        ]);
        Ok(reading)
    }

    #[instrument(skip(self))]
    async fn power_flow(&self, now: NaiveDateTime) -> Result<PowerFlow, ApplicationError> {
        let flow = self
            .client
            .current_power_flow()
            .await
            .map_err(Self::map_error)?;

        let power = Self::map_power(&flow, now);
        log_fields(&[
            ("datetime", power.datetime.to_string()),
            ("grid_status", power.grid_status.clone()),
            ("solar_status", power.solar_status.clone()),
            ("battery_status", power.battery_status.clone()),
            ("battery_charge", power.battery_charge.to_string()),
            ("power_usage", power.power_usage.to_string()),
        ]);
        Ok(power)
    }
}
