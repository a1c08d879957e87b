//! Environment sensor collector
//!
//! Reads the node's temperature/humidity sensor, stores the reading in the
//! `environment` table and raises throttled alerts when a value leaves the
//! location's comfort range.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use domain::entities::{EnvironmentReading, NotificationKind};
use domain::value_objects::{Location, celsius_to_fahrenheit};
use tracing::{info, instrument, warn};

use super::alert_throttle::AlertThrottle;
use super::db_manager::{DbManager, WriteOutcome};
use super::notification_service::NotificationService;
use super::polling::Collector;
use crate::error::ApplicationError;
use crate::ports::EnvironmentSensorPort;

/// Attempts after which the sensor is re-initialized before reading
const RESET_AFTER_ATTEMPTS: u32 = 2;

pub struct SensorService {
    sensor: Arc<dyn EnvironmentSensorPort>,
    db: Arc<DbManager>,
    notifier: Arc<NotificationService>,
    location: Location,
    throttle: AlertThrottle,
}

impl std::fmt::Debug for SensorService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorService")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl SensorService {
    pub const APP: &'static str = "sensor_mgr";

    pub fn new(
        sensor: Arc<dyn EnvironmentSensorPort>,
        db: Arc<DbManager>,
        notifier: Arc<NotificationService>,
        location: Location,
    ) -> Self {
        Self {
            sensor,
            db,
            notifier,
            location,
            throttle: AlertThrottle::default(),
        }
    }

    /// Take one sample and convert it to a reading
    pub async fn read_environment(
        &self,
        now: NaiveDateTime,
    ) -> Result<EnvironmentReading, ApplicationError> {
        let sample = self.sensor.read().await?;
        let reading = EnvironmentReading::new(
            now,
            celsius_to_fahrenheit(sample.celsius),
            sample.humidity,
            self.location,
        );
        info!(
            location = %reading.location,
            temperature = reading.temperature,
            humidity = reading.humidity,
            "Current environment data"
        );
        Ok(reading)
    }

    pub async fn record(&self, reading: &EnvironmentReading) -> Result<WriteOutcome, ApplicationError> {
        self.db
            .insert_data(EnvironmentReading::TABLE, vec![reading.to_record()])
            .await
    }

    async fn alert(&self, kind: &str, msg: String, now: NaiveDateTime) {
        if !self.throttle.try_acquire(kind, now) {
            return;
        }
        if let Err(e) = self
            .notifier
            .notify(&msg, NotificationKind::Alert, Self::APP, now)
            .await
        {
            warn!(error = %e, alert = kind, "Could not send alert");
        }
    }
}

#[async_trait]
impl Collector for SensorService {
    fn name(&self) -> &str {
        Self::APP
    }

    async fn before_attempt(&self, attempt: u32) -> Result<(), ApplicationError> {
        if attempt > RESET_AFTER_ATTEMPTS {
            info!(attempt, "Resetting sensor");
            self.sensor.reset().await?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(location = %self.location))]
    async fn collect(&self, now: NaiveDateTime) -> Result<(), ApplicationError> {
        let reading = self.read_environment(now).await?;
        self.record(&reading).await?;

        let title = self.location.title();
        if reading.temperature_critical() {
            let msg = format!(
                "{title} temperature critical at {:.1}\u{b0}F.",
                reading.temperature
            );
            self.alert("temperature", msg, now).await;
        }
        if reading.humidity_critical() {
            let msg = format!("{title} humidity critical at {:.1}%.", reading.humidity);
            self.alert("humidity", msg, now).await;
        }
        Ok(())
    }
}
