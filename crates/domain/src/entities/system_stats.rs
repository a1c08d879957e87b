//! Host health snapshot

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{Location, Record};

const CPU_TEMP_MAX: f64 = 65.0;
const CPU_USAGE_MAX: f64 = 70.0;
const MEM_USAGE_MAX: f64 = 70.0;
const DISK_USAGE_MAX: f64 = 90.0;

/// Health statistics for one node at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    pub nodename: String,
    pub datetime: NaiveDateTime,
    /// Degrees Celsius
    pub cpu_temp: f64,
    /// Percent
    pub cpu_usage: f64,
    /// Percent
    pub mem_usage: f64,
    /// Bytes used on `/`
    pub disk_usage: u64,
    /// Bytes total on `/`
    pub disk_total: u64,
    pub uptime: String,
    /// Only set on sensor nodes
    pub location: Option<Location>,
}

/// A statistic that crossed its alert threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticalStat {
    CpuTemperature,
    CpuUsage,
    MemoryUsage,
    DiskUsage,
}

impl CriticalStat {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CpuTemperature => "cpu_temp",
            Self::CpuUsage => "cpu_usage",
            Self::MemoryUsage => "mem_usage",
            Self::DiskUsage => "disk_usage",
        }
    }

    /// Alert text for the given snapshot
    #[must_use]
    pub fn message(&self, stats: &SystemStats) -> String {
        let node = &stats.nodename;
        match self {
            Self::CpuTemperature => {
                format!("{node} CPU temperature critical at {}\u{b0}C.", stats.cpu_temp)
            },
            Self::CpuUsage => format!("{node} CPU Usage critical at {}%.", stats.cpu_usage),
            Self::MemoryUsage => format!("{node} Memory Usage critical at {}%.", stats.mem_usage),
            Self::DiskUsage => format!(
                "{node} Disk Usage critical at {:.2}%.",
                stats.disk_percent()
            ),
        }
    }
}

impl SystemStats {
    pub const TABLE: &'static str = "system_stats";

    /// Share of the root disk in use, as a percentage
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn disk_percent(&self) -> f64 {
        if self.disk_total == 0 {
            return 0.0;
        }
        self.disk_usage as f64 / self.disk_total as f64 * 100.0
    }

    /// Every statistic at or above its threshold
    #[must_use]
    pub fn critical_stats(&self) -> Vec<CriticalStat> {
        let mut out = Vec::new();
        if self.cpu_temp >= CPU_TEMP_MAX {
            out.push(CriticalStat::CpuTemperature);
        }
        if self.cpu_usage >= CPU_USAGE_MAX {
            out.push(CriticalStat::CpuUsage);
        }
        if self.mem_usage >= MEM_USAGE_MAX {
            out.push(CriticalStat::MemoryUsage);
        }
        if self.disk_percent() >= DISK_USAGE_MAX {
            out.push(CriticalStat::DiskUsage);
        }
        out
    }

    #[must_use]
    pub fn to_record(&self) -> Record {
        Record::new()
            .with("nodename", self.nodename.as_str())
            .with("datetime", self.datetime)
            .with("cpu_temp", self.cpu_temp)
            .with("cpu_usage", self.cpu_usage)
            .with("mem_usage", self.mem_usage)
            .with("disk_usage", self.disk_usage)
            .with("disk_total", self.disk_total)
            .with("uptime", self.uptime.as_str())
            .with("location", self.location.map(|l| l.as_str()))
    }

    pub fn from_record(record: &Record) -> Result<Self, DomainError> {
        let bytes = |column: &str| {
            u64::try_from(record.int(column)?)
                .map_err(|_| DomainError::invalid_value(column, "negative byte count"))
        };
        Ok(Self {
            nodename: record.text("nodename")?,
            datetime: record.timestamp("datetime")?,
            cpu_temp: record.float("cpu_temp")?,
            cpu_usage: record.float("cpu_usage")?,
            mem_usage: record.float("mem_usage")?,
            disk_usage: bytes("disk_usage")?,
            disk_total: bytes("disk_total")?,
            uptime: record.text("uptime")?,
            location: record
                .optional_text("location")?
                .map(|l| l.parse())
                .transpose()?,
        })
    }
}
