//! Solar production collector
//!
//! Pulls today's energy totals and the current power flow from the inverter
//! monitoring API. Energy is upserted by date; power flow is appended. Status
//! transitions between consecutive power flows are pushed as alerts.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use domain::entities::{EnergyReading, NotificationKind, PowerFlow};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use super::db_manager::DbManager;
use super::notification_service::NotificationService;
use super::polling::Collector;
use crate::error::ApplicationError;
use crate::ports::SolarPort;

pub struct SolarService {
    solar: Arc<dyn SolarPort>,
    db: Arc<DbManager>,
    notifier: Arc<NotificationService>,
    previous: Mutex<Option<PowerFlow>>,
}

impl std::fmt::Debug for SolarService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolarService").finish_non_exhaustive()
    }
}

/// Alerts implied by moving from `previous` to `current`
#[must_use]
pub fn status_changes(previous: &PowerFlow, current: &PowerFlow) -> Vec<String> {
    let mut alerts = Vec::new();
    if current.battery_critical && !previous.battery_critical {
        alerts.push("Battery status is critical. Please investigate.".to_string());
    }
    for column in PowerFlow::STATUS_COLUMNS {
        let (Some(before), Some(after)) = (previous.status(column), current.status(column)) else {
            continue;
        };
        if before != after {
            alerts.push(format!(
                "{} switched from {before} to {after}",
                title_case(column)
            ));
        }
    }
    alerts
}

/// `battery_status` -> `Battery Status`
fn title_case(column: &str) -> String {
    column
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl SolarService {
    pub const APP: &'static str = "solar_mgr";

    pub fn new(
        solar: Arc<dyn SolarPort>,
        db: Arc<DbManager>,
        notifier: Arc<NotificationService>,
    ) -> Self {
        Self {
            solar,
            db,
            notifier,
            previous: Mutex::new(None),
        }
    }

    /// Energy produced and consumed from midnight until `now`
    pub async fn energy_today(&self, now: NaiveDateTime) -> Result<EnergyReading, ApplicationError> {
        let start = now.date().and_time(chrono::NaiveTime::MIN);
        self.solar.energy_details(start, now).await
    }
}

#[async_trait]
impl Collector for SolarService {
    fn name(&self) -> &str {
        Self::APP
    }

    #[instrument(skip(self))]
    async fn collect(&self, now: NaiveDateTime) -> Result<(), ApplicationError> {
        let energy = self.energy_today(now).await?;
        let power = self.solar.power_flow(now).await?;
        info!(
            production = energy.production,
            consumption = energy.consumption,
            solar_power = power.solar_power,
            battery_charge = power.battery_charge,
            "Fetched solar data"
        );

        self.db
            .insert_or_update_data(
                EnergyReading::TABLE,
                vec![energy.to_record()],
                &EnergyReading::KEY_COLUMNS,
            )
            .await?;
        self.db
            .insert_data(PowerFlow::TABLE, vec![power.to_record()])
            .await?;

        let previous = self.previous.lock().replace(power.clone());
        let Some(previous) = previous else {
            debug!("No previous power data to compare");
            return Ok(());
        };
        for msg in status_changes(&previous, &power) {
            info!(alert = %msg, "Power status changed");
            if let Err(e) = self
                .notifier
                .notify(&msg, NotificationKind::Alert, Self::APP, now)
                .await
            {
                warn!(error = %e, "Could not send alert");
            }
        }
        Ok(())
    }
}
