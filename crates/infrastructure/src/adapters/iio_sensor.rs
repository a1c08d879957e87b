//! DHT22 temperature/humidity sensor through the Linux IIO subsystem
//!
//! The kernel `dht11` driver (which also handles the DHT22) exposes
//! `in_temp_input` in millidegrees Celsius and `in_humidityrelative_input`
//! in milli-percent. Reads fail with `EIO` fairly often; the polling
//! daemon's retries absorb that.

use std::path::{Path, PathBuf};

use application::ApplicationError;
use application::ports::{EnvironmentSensorPort, SensorSample};
use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::config::SensorDeviceConfig;

const TEMPERATURE_FILE: &str = "in_temp_input";
const HUMIDITY_FILE: &str = "in_humidityrelative_input";

#[derive(Debug, Clone)]
pub struct IioEnvironmentSensor {
    device: PathBuf,
    rebind: Option<(PathBuf, String)>,
}

impl IioEnvironmentSensor {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            rebind: None,
        }
    }

    /// Rebind `device_name` through `driver_dir` on reset
    #[must_use]
    pub fn with_rebind(mut self, driver_dir: impl Into<PathBuf>, device_name: impl Into<String>) -> Self {
        self.rebind = Some((driver_dir.into(), device_name.into()));
        self
    }

    pub fn from_config(config: &SensorDeviceConfig) -> Self {
        let sensor = Self::new(&config.iio_device);
        match (&config.driver_dir, &config.device_name) {
            (Some(dir), Some(name)) => sensor.with_rebind(dir, name),
            _ => sensor,
        }
    }

    async fn read_milli(&self, file: &str) -> Result<f64, ApplicationError> {
        let path = self.device.join(file);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ApplicationError::Io(format!("{}: {e}", path.display())))?;
        parse_milli(&raw).ok_or_else(|| {
            ApplicationError::Io(format!("{}: unexpected value {:?}", path.display(), raw.trim()))
        })
    }
}

#[allow(clippy::cast_precision_loss)]
fn parse_milli(raw: &str) -> Option<f64> {
    raw.trim().parse::<i64>().ok().map(|v| v as f64 / 1000.0)
}

async fn write_sysfs(path: &Path, value: &str) -> Result<(), ApplicationError> {
    tokio::fs::write(path, value)
        .await
        .map_err(|e| ApplicationError::Io(format!("{}: {e}", path.display())))
}

#[async_trait]
impl EnvironmentSensorPort for IioEnvironmentSensor {
    #[instrument(skip(self), fields(device = %self.device.display()))]
    async fn read(&self) -> Result<SensorSample, ApplicationError> {
        let celsius = self.read_milli(TEMPERATURE_FILE).await?;
        let humidity = self.read_milli(HUMIDITY_FILE).await?;
        debug!(celsius, humidity, "Sensor read");
        Ok(SensorSample { celsius, humidity })
    }

    #[instrument(skip(self), fields(device = %self.device.display()))]
    async fn reset(&self) -> Result<(), ApplicationError> {
        match &self.rebind {
            Some((driver_dir, name)) => {
                info!(driver = %driver_dir.display(), %name, "Rebinding sensor driver");
                if let Err(e) = write_sysfs(&driver_dir.join("unbind"), name).await {
                    // Already unbound
                    warn!(error = %e, "Unbind failed");
                }
                write_sysfs(&driver_dir.join("bind"), name).await
            },
            None => {
                tokio::fs::metadata(&self.device).await.map_err(|e| {
                    ApplicationError::Io(format!("{}: {e}", self.device.display()))
                })?;
                debug!("No rebind configured, device still present");
                Ok(())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn device(temp: &str, humidity: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(TEMPERATURE_FILE), temp).unwrap();
        std::fs::write(dir.path().join(HUMIDITY_FILE), humidity).unwrap();
        dir
    }

    #[test]
    fn parses_milli_units() {
        assert_eq!(parse_milli("21500\n"), Some(21.5));
        assert_eq!(parse_milli("-3000"), Some(-3.0));
        assert_eq!(parse_milli("n/a"), None);
    }

    #[tokio::test]
    async fn reads_both_channels() {
        let dir = device("22300\n", "41700\n");
        let sample = IioEnvironmentSensor::new(dir.path()).read().await.unwrap();
        assert!((sample.celsius - 22.3).abs() < 1e-9);
        assert!((sample.humidity - 41.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn missing_channel_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = IioEnvironmentSensor::new(dir.path()).read().await.unwrap_err();
        assert!(matches!(err, ApplicationError::Io(_)));
    }

    #[tokio::test]
    async fn garbage_value_is_io_error() {
        let dir = device("garbage", "41700");
        let err = IioEnvironmentSensor::new(dir.path()).read().await.unwrap_err();
        assert!(err.to_string().contains("unexpected value"));
    }

    #[tokio::test]
    async fn reset_rebinds_driver() {
        let dev = device("1", "1");
        let driver = TempDir::new().unwrap();
        let sensor = IioEnvironmentSensor::new(dev.path()).with_rebind(driver.path(), "dht11@0");

        sensor.reset().await.unwrap();

        assert_eq!(
            std::fs::read_to_string(driver.path().join("unbind")).unwrap(),
            "dht11@0"
        );
        assert_eq!(
            std::fs::read_to_string(driver.path().join("bind")).unwrap(),
            "dht11@0"
        );
    }

    #[tokio::test]
    async fn reset_without_rebind_checks_device() {
        let dev = device("1", "1");
        IioEnvironmentSensor::new(dev.path()).reset().await.unwrap();

        let gone = IioEnvironmentSensor::new("/nonexistent/iio:device9");
        assert!(gone.reset().await.is_err());
    }
}
