//! Environment sensor port

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Raw sample from a temperature/humidity sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    pub celsius: f64,
    pub humidity: f64,
}

/// Port for a DHT-style temperature/humidity sensor
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EnvironmentSensorPort: Send + Sync {
    async fn read(&self) -> Result<SensorSample, ApplicationError>;

    /// Re-initialize the device after repeated read failures
    async fn reset(&self) -> Result<(), ApplicationError>;
}
