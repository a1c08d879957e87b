//! Host statistics for the health daemon, backed by `sysinfo`

use std::path::{Path, PathBuf};

use application::ApplicationError;
use application::ports::SystemStatsPort;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use domain::{Location, SystemStats, format_uptime};
use parking_lot::Mutex;
use sysinfo::{Disks, System};
use tracing::{debug, instrument, warn};

use crate::config::StatsConfig;
use crate::telemetry::log_fields;

/// Samples CPU, memory, disk and uptime for this host
///
/// CPU usage is measured between consecutive calls, so the first sample
/// after construction waits one `sysinfo` refresh interval.
pub struct SysinfoStatsCollector {
    system: Mutex<System>,
    primed: Mutex<bool>,
    nodename: String,
    location: Option<Location>,
    thermal_zone: PathBuf,
    disk_mount: PathBuf,
}

impl std::fmt::Debug for SysinfoStatsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoStatsCollector")
            .field("nodename", &self.nodename)
            .field("location", &self.location)
            .field("disk_mount", &self.disk_mount)
            .finish_non_exhaustive()
    }
}

impl SysinfoStatsCollector {
    pub fn new(config: &StatsConfig, nodename: impl Into<String>, location: Option<Location>) -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self {
            system: Mutex::new(system),
            primed: Mutex::new(false),
            nodename: nodename.into(),
            location,
            thermal_zone: config.thermal_zone.clone(),
            disk_mount: config.disk_mount.clone(),
        }
    }

    /// Location is only reported for sensor nodes
    fn reported_location(&self) -> Option<Location> {
        if self.nodename.contains("sensor") {
            self.location
        } else {
            None
        }
    }

    async fn cpu_and_memory(&self) -> (f64, f64) {
        let needs_prime = {
            let mut primed = self.primed.lock();
            !std::mem::replace(&mut *primed, true)
        };
        if needs_prime {
            tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        }

        let mut system = self.system.lock();
        system.refresh_cpu_usage();
        system.refresh_memory();
        let cpu = f64::from(system.global_cpu_usage());
        let mem = memory_percent(system.total_memory(), system.available_memory());
        (cpu, mem)
    }

    fn disk(&self) -> Result<(u64, u64), ApplicationError> {
        let disks = Disks::new_with_refreshed_list();
        let mounts: Vec<(&Path, u64, u64)> = disks
            .list()
            .iter()
            .map(|d| (d.mount_point(), d.total_space(), d.available_space()))
            .collect();
        disk_for_mount(&mounts, &self.disk_mount).ok_or_else(|| {
            ApplicationError::Io(format!("No disk mounted at {}", self.disk_mount.display()))
        })
    }

    async fn cpu_temperature(&self) -> f64 {
        match read_millidegrees(&self.thermal_zone).await {
            Ok(temp) => temp,
            Err(e) => {
                warn!(error = %e, "CPU temperature unavailable");
                0.0
            },
        }
    }
}

async fn read_millidegrees(path: &Path) -> Result<f64, ApplicationError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ApplicationError::Io(format!("{}: {e}", path.display())))?;
    raw.trim()
        .parse::<f64>()
        .map(|v| v / 1000.0)
        .map_err(|e| ApplicationError::Io(format!("{}: {e}", path.display())))
}

#[allow(clippy::cast_precision_loss)]
fn memory_percent(total: u64, available: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (total.saturating_sub(available) as f64 / total as f64) * 100.0
}

/// `(used, total)` of the disk mounted at `mount`, or the one with the
/// longest mount point containing it
fn disk_for_mount(disks: &[(&Path, u64, u64)], mount: &Path) -> Option<(u64, u64)> {
    disks
        .iter()
        .filter(|(point, _, _)| mount.starts_with(point))
        .max_by_key(|(point, _, _)| point.as_os_str().len())
        .map(|(_, total, available)| (total.saturating_sub(*available), *total))
}

#[async_trait]
impl SystemStatsPort for SysinfoStatsCollector {
    #[instrument(skip(self), fields(node = %self.nodename))]
    async fn collect(&self, now: NaiveDateTime) -> Result<SystemStats, ApplicationError> {
        let (cpu_usage, mem_usage) = self.cpu_and_memory().await;
        let (disk_usage, disk_total) = self.disk()?;
        let cpu_temp = self.cpu_temperature().await;
        debug!(cpu_usage, mem_usage, disk_usage, "Stats sampled");

        let stats = SystemStats {
            nodename: self.nodename.clone(),
            datetime: now,
            cpu_temp,
            cpu_usage,
            mem_usage,
            disk_usage,
            disk_total,
            uptime: format_uptime(System::uptime()),
            location: self.reported_location(),
        };
        log_fields(&[
            ("nodename", stats.nodename.clone()),
            ("cpu_temp", format!("{:.2}", stats.cpu_temp)),
            ("cpu_usage", format!("{:.2}", stats.cpu_usage)),
            ("mem_usage", format!("{:.2}", stats.mem_usage)),
            ("disk_usage", stats.disk_usage.to_string()),
            ("disk_total", stats.disk_total.to_string()),
            ("uptime", stats.uptime.clone()),
        ]);
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn memory_percent_from_available() {
        assert!((memory_percent(1000, 250) - 75.0).abs() < f64::EPSILON);
        assert!(memory_percent(0, 0).abs() < f64::EPSILON);
    }

    #[test]
    fn picks_most_specific_mount() {
        let disks = [
            (Path::new("/"), 100, 40),
            (Path::new("/boot"), 10, 5),
            (Path::new("/mnt/backup"), 1000, 900),
        ];
        assert_eq!(disk_for_mount(&disks, Path::new("/")), Some((60, 100)));
        assert_eq!(
            disk_for_mount(&disks, Path::new("/mnt/backup")),
            Some((100, 1000))
        );
        assert_eq!(disk_for_mount(&disks, Path::new("/var/lib")), Some((60, 100)));
        assert_eq!(disk_for_mount(&[], Path::new("/")), None);
    }

    #[tokio::test]
    async fn thermal_zone_is_millidegrees() {
        let dir = tempfile::tempdir().unwrap();
        let zone = dir.path().join("temp");
        std::fs::write(&zone, "48312\n").unwrap();
        let temp = read_millidegrees(&zone).await.unwrap();
        assert!((temp - 48.312).abs() < 1e-9);
    }

    #[test]
    fn location_only_for_sensor_nodes() {
        let config = StatsConfig::default();
        let sensor = SysinfoStatsCollector::new(&config, "pisensor2", Some(Location::Attic));
        assert_eq!(sensor.reported_location(), Some(Location::Attic));

        let hub = SysinfoStatsCollector::new(&config, "pihub", Some(Location::Attic));
        assert_eq!(hub.reported_location(), None);
    }

    #[tokio::test]
    async fn collects_live_stats() {
        let dir = tempfile::tempdir().unwrap();
        let config = StatsConfig {
            thermal_zone: dir.path().join("missing"),
            disk_mount: PathBuf::from("/"),
        };
        let collector = SysinfoStatsCollector::new(&config, "testnode", None);
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 5, 10)
            .unwrap();

        // Container filesystems may not list a disk for "/"
        if let Ok(stats) = collector.collect(now).await {
            assert_eq!(stats.nodename, "testnode");
            assert!(stats.uptime.starts_with("UP "));
            assert!(stats.cpu_temp.abs() < f64::EPSILON);
            assert!((0.0..=100.0).contains(&stats.mem_usage));
        }
    }
}
