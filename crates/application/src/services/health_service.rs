//! Host health collector
//!
//! Samples CPU, memory and disk usage, stores them in `system_stats` and
//! raises a throttled critical notification for each statistic over its
//! threshold.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use domain::entities::{NotificationKind, SystemStats};
use tracing::{info, instrument, warn};

use super::alert_throttle::AlertThrottle;
use super::db_manager::DbManager;
use super::notification_service::NotificationService;
use super::polling::Collector;
use crate::error::ApplicationError;
use crate::ports::SystemStatsPort;

pub struct HealthService {
    stats: Arc<dyn SystemStatsPort>,
    db: Arc<DbManager>,
    notifier: Arc<NotificationService>,
    throttle: AlertThrottle,
}

impl std::fmt::Debug for HealthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthService").finish_non_exhaustive()
    }
}

impl HealthService {
    pub const APP: &'static str = "health_check";

    pub fn new(
        stats: Arc<dyn SystemStatsPort>,
        db: Arc<DbManager>,
        notifier: Arc<NotificationService>,
    ) -> Self {
        Self {
            stats,
            db,
            notifier,
            throttle: AlertThrottle::default(),
        }
    }

    async fn alert_critical(&self, stats: &SystemStats, now: NaiveDateTime) {
        for stat in stats.critical_stats() {
            if !self.throttle.try_acquire(stat.as_str(), now) {
                continue;
            }
            let msg = stat.message(stats);
            if let Err(e) = self
                .notifier
                .notify(&msg, NotificationKind::Critical, Self::APP, now)
                .await
            {
                warn!(error = %e, stat = stat.as_str(), "Could not send alert");
            }
        }
    }
}

#[async_trait]
impl Collector for HealthService {
    fn name(&self) -> &str {
        Self::APP
    }

    #[instrument(skip(self))]
    async fn collect(&self, now: NaiveDateTime) -> Result<(), ApplicationError> {
        let stats = self.stats.collect(now).await?;
        info!(
            node = %stats.nodename,
            cpu_temp = stats.cpu_temp,
            cpu_usage = stats.cpu_usage,
            mem_usage = stats.mem_usage,
            disk_percent = stats.disk_percent(),
            uptime = %stats.uptime,
            "Current system stats"
        );
        self.db
            .insert_data(SystemStats::TABLE, vec![stats.to_record()])
            .await?;
        self.alert_critical(&stats, now).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{MockPushPort, MockSystemStatsPort, MockTableStorePort, StoreTarget};
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 11, 2)
            .unwrap()
            .and_hms_opt(h, m, 10)
            .unwrap()
    }

    fn stats_port(cpu_temp: f64, disk_usage: u64) -> MockSystemStatsPort {
        let mut port = MockSystemStatsPort::new();
        port.expect_collect().returning(move |now| {
            Ok(SystemStats {
                nodename: "piweb".into(),
                datetime: now,
                cpu_temp,
                cpu_usage: 5.0,
                mem_usage: 20.0,
                disk_usage,
                disk_total: 100,
                uptime: "UP 0:10:00".into(),
                location: None,
            })
        });
        port
    }

    fn service(port: MockSystemStatsPort, push: MockPushPort, report: MockTableStorePort) -> HealthService {
        let mut store = MockTableStorePort::new();
        store
            .expect_insert()
            .withf(|table, _| table == "system_stats")
            .returning(|_, _| Ok(1));
        let notifier = NotificationService::new(
            Arc::new(push),
            Arc::new(DbManager::new(Arc::new(report), StoreTarget::new("report"))),
            "piweb",
        );
        HealthService::new(
            Arc::new(port),
            Arc::new(DbManager::new(Arc::new(store), StoreTarget::new("report"))),
            Arc::new(notifier),
        )
    }

    #[tokio::test]
    async fn healthy_node_sends_nothing() {
        let mut push = MockPushPort::new();
        push.expect_push().never();
        let svc = service(stats_port(45.0, 10), push, MockTableStorePort::new());
        svc.collect(at(8, 0)).await.unwrap();
    }

    #[tokio::test]
    async fn disk_alert_is_throttled_independently() {
        let mut push = MockPushPort::new();
        push.expect_push()
            .withf(|_, app, msg| app == "health_check" && msg.contains("Disk Usage critical at 95.00%"))
            .times(1)
            .returning(|_, _, _| Ok(true));
        push.expect_push()
            .withf(|_, _, msg| msg.contains("CPU temperature critical"))
            .times(1)
            .returning(|_, _, _| Ok(true));
        let mut report = MockTableStorePort::new();
        report
            .expect_insert()
            .withf(|_, rows| rows[0].text("type").unwrap() == "critical")
            .times(2)
            .returning(|_, _| Ok(1));

        let svc = service(stats_port(70.0, 95), push, report);
        svc.collect(at(8, 0)).await.unwrap();
        svc.collect(at(8, 5)).await.unwrap();
    }
}
