//! Schedules for the node daemons and the daily backup

use std::path::PathBuf;
use std::time::Duration;

use application::{AttemptPolicy, PollSchedule};
use serde::{Deserialize, Serialize};

/// When a polling daemon runs and how hard it tries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Run when `minute % every_minutes == offset`
    pub every_minutes: u32,
    #[serde(default)]
    pub offset: u32,
    pub max_tries: u32,
    /// Pause between failed attempts
    pub wait_secs: u64,
}

impl PollConfig {
    #[must_use]
    pub const fn new(every_minutes: u32, offset: u32, max_tries: u32, wait_secs: u64) -> Self {
        Self {
            every_minutes,
            offset,
            max_tries,
            wait_secs,
        }
    }

    #[must_use]
    pub const fn schedule(&self) -> PollSchedule {
        PollSchedule::every(self.every_minutes).with_offset(self.offset)
    }

    #[must_use]
    pub const fn policy(&self) -> AttemptPolicy {
        AttemptPolicy::new(self.max_tries, Duration::from_secs(self.wait_secs))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonsConfig {
    #[serde(default = "default_sensor")]
    pub sensor: PollConfig,
    #[serde(default = "default_solar")]
    pub solar: PollConfig,
    #[serde(default = "default_quote")]
    pub quote: PollConfig,
    #[serde(default = "default_health")]
    pub health: PollConfig,
    /// Replay of deferred writes
    #[serde(default = "default_sweep")]
    pub sweep: PollConfig,
}

const fn default_sensor() -> PollConfig {
    PollConfig::new(3, 0, 5, 5)
}

/// One minute past every ten, after the inverter has reported
const fn default_solar() -> PollConfig {
    PollConfig::new(10, 1, 3, 10)
}

const fn default_quote() -> PollConfig {
    PollConfig::new(15, 0, 2, 30)
}

const fn default_health() -> PollConfig {
    PollConfig::new(5, 0, 5, 5)
}

const fn default_sweep() -> PollConfig {
    PollConfig::new(5, 0, 1, 0)
}

impl Default for DaemonsConfig {
    fn default() -> Self {
        Self {
            sensor: default_sensor(),
            solar: default_solar(),
            quote: default_quote(),
            health: default_health(),
            sweep: default_sweep(),
        }
    }
}

/// Daily backup of the database, vault data and media
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Root directory; `db/`, `vault/` and `pihome_media/` are created below it
    #[serde(default = "default_backup_dir")]
    pub dir: PathBuf,

    /// Backups older than this many days are removed
    #[serde(default = "default_keep_days")]
    pub keep_days: u64,

    /// Local hour at which the daemon runs the backup
    #[serde(default = "default_hour")]
    pub hour: u32,

    /// Database passed to `pg_dump`
    #[serde(default = "default_db_name")]
    pub db_name: String,

    #[serde(default = "default_pg_dump")]
    pub pg_dump: PathBuf,

    /// Parallel dump jobs
    #[serde(default = "default_jobs")]
    pub jobs: u32,

    #[serde(default = "default_vault_dir")]
    pub vault_dir: PathBuf,

    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("/mnt/backup")
}

const fn default_keep_days() -> u64 {
    3
}

const fn default_hour() -> u32 {
    13
}

fn default_db_name() -> String {
    "pihome".to_string()
}

fn default_pg_dump() -> PathBuf {
    PathBuf::from("pg_dump")
}

const fn default_jobs() -> u32 {
    5
}

fn default_vault_dir() -> PathBuf {
    PathBuf::from("/vault/data")
}

fn default_media_dir() -> PathBuf {
    PathBuf::from("/var/lib/pihome/media")
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: default_backup_dir(),
            keep_days: default_keep_days(),
            hour: default_hour(),
            db_name: default_db_name(),
            pg_dump: default_pg_dump(),
            jobs: default_jobs(),
            vault_dir: default_vault_dir(),
            media_dir: default_media_dir(),
        }
    }
}
