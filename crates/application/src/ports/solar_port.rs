//! Solar inverter monitoring port

use async_trait::async_trait;
use chrono::NaiveDateTime;
use domain::entities::{EnergyReading, PowerFlow};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait SolarPort: Send + Sync {
    /// Energy totals between `start` and `end`, dated by `start`
    async fn energy_details(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<EnergyReading, ApplicationError>;

    /// Current power flow stamped with `now`
    async fn power_flow(&self, now: NaiveDateTime) -> Result<PowerFlow, ApplicationError>;
}
