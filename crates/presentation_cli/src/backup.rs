//! Daily backup of the database, the vault data and the dashboard media
//!
//! The database is dumped with `pg_dump` in directory format; the vault and
//! media directories are packed with `tar`. Each kind lives in its own
//! sub-directory of the backup root, where entries older than `keep_days`
//! are removed before a new one is written.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::str::FromStr;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use cron::Schedule;
use infrastructure::BackupConfig;
use infrastructure::telemetry::RULE_WIDTH;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);
const DATE_FORMAT: &str = "%Y%m%d";

/// Cron schedule firing daily at `hour:00:10` local time
pub fn daily_schedule(hour: u32) -> Result<Schedule> {
    Schedule::from_str(&format!("10 0 {hour} * * *"))
        .with_context(|| format!("Invalid backup hour {hour}"))
}

/// Wait for each scheduled time and back up; runs until cancelled
pub async fn run_daily(config: &BackupConfig) -> Result<()> {
    let schedule = daily_schedule(config.hour)?;
    info!(hour = config.hour, dir = %config.dir.display(), "Starting backup service");
    loop {
        let Some(next) = schedule.upcoming(Local).next() else {
            bail!("Backup schedule has no upcoming run");
        };
        info!(%next, "Waiting for next backup");
        let pause = (next - Local::now()).to_std().unwrap_or(Duration::ZERO);
        tokio::time::sleep(pause).await;

        if let Err(e) = run_backup(config, Local::now().date_naive()).await {
            error!(error = %e, "Backup incomplete");
        }
    }
}

/// Run every backup step for `today`; a failed step does not stop the others
pub async fn run_backup(config: &BackupConfig, today: NaiveDate) -> Result<()> {
    let mut failed = Vec::new();

    if let Err(e) = backup_db(config, today).await {
        error!(error = ?e, "DB backup error");
        failed.push("database");
    }
    if let Err(e) = backup_dir(config, &config.vault_dir, "vault", "vault", today).await {
        error!(error = ?e, "Could not back up vault data");
        failed.push("vault");
    }
    if let Err(e) = backup_dir(config, &config.media_dir, "pihome_media", "pihome_media", today).await {
        error!(error = ?e, "Could not back up media");
        failed.push("media");
    }

    if failed.is_empty() {
        info!("Backup complete");
        Ok(())
    } else {
        bail!("Backup failed for: {}", failed.join(", "))
    }
}

/// `pg_dump` arguments writing a directory-format dump to `dest`
pub fn dump_args(config: &BackupConfig, dest: &Path) -> Vec<String> {
    vec![
        config.db_name.clone(),
        "-Fd".to_string(),
        "-f".to_string(),
        dest.display().to_string(),
        "-j".to_string(),
        config.jobs.to_string(),
        "-v".to_string(),
    ]
}

/// Dump the database to `{dir}/db/dump_{date}`
pub async fn backup_db(config: &BackupConfig, today: NaiveDate) -> Result<PathBuf> {
    info!("Backing up database");
    let root = prepare_dir(config, "db").await?;
    let dest = root.join(format!("dump_{}", today.format(DATE_FORMAT)));

    let args = dump_args(config, &dest);
    info!(command = %config.pg_dump.display(), args = %args.join(" "), "Running backup command");
    let output = Command::new(&config.pg_dump)
        .args(&args)
        .output()
        .await
        .with_context(|| format!("Failed to run {}", config.pg_dump.display()))?;
    log_output(&output);

    if !output.status.success() {
        bail!("pg_dump exited with {}", output.status);
    }
    Ok(dest)
}

/// Pack `source` into `{dir}/{kind}/{prefix}_{date}.tar.gz`
pub async fn backup_dir(
    config: &BackupConfig,
    source: &Path,
    kind: &str,
    prefix: &str,
    today: NaiveDate,
) -> Result<PathBuf> {
    info!(source = %source.display(), "Backing up {kind} data");
    let root = prepare_dir(config, kind).await?;
    let archive = root.join(format!("{prefix}_{}.tar.gz", today.format(DATE_FORMAT)));

    let parent = source.parent().unwrap_or_else(|| Path::new("/"));
    let name = source
        .file_name()
        .with_context(|| format!("Cannot archive {}", source.display()))?;
    let output = Command::new("tar")
        .arg("-czf")
        .arg(&archive)
        .arg("-C")
        .arg(parent)
        .arg(name)
        .output()
        .await
        .context("Failed to run tar")?;

    if !output.status.success() {
        bail!(
            "tar exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    info!(archive = %archive.display(), "TAR file created");
    Ok(archive)
}

/// Create `{dir}/{kind}` and clear out its expired entries
async fn prepare_dir(config: &BackupConfig, kind: &str) -> Result<PathBuf> {
    let root = config.dir.join(kind);
    tokio::fs::create_dir_all(&root)
        .await
        .with_context(|| format!("Failed to create {}", root.display()))?;
    cleanup_old_backups(&root, config.keep_days).await?;
    Ok(root)
}

fn log_output(output: &Output) {
    let rule = "=".repeat(RULE_WIDTH);
    for (label, bytes) in [("STDOUT", &output.stdout), ("STDERR", &output.stderr)] {
        info!("{label} LINES:");
        info!("{rule}");
        for line in String::from_utf8_lossy(bytes).lines() {
            info!("{line}");
        }
        info!("{rule}");
    }
}

/// Whole days since `modified`
fn age_in_days(modified: SystemTime, now: SystemTime) -> u64 {
    now.duration_since(modified)
        .map_or(0, |age| age.as_secs() / DAY.as_secs())
}

/// Delete entries of `backup_dir` last modified more than `keep_days` days ago
///
/// Directories are removed with their contents. Returns the number deleted.
pub async fn cleanup_old_backups(backup_dir: &Path, keep_days: u64) -> Result<usize> {
    info!(dir = %backup_dir.display(), "Cleaning up old backups");
    let now = SystemTime::now();
    let mut entries = tokio::fs::read_dir(backup_dir)
        .await
        .context("Failed to read backup directory")?;

    let mut deleted = 0;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let metadata = entry.metadata().await?;
        if age_in_days(metadata.modified()?, now) <= keep_days {
            continue;
        }

        debug!(path = %path.display(), "Deleting expired backup");
        let removed = if metadata.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };
        match removed {
            Ok(()) => {
                info!(path = %path.display(), "Deleted old backup");
                deleted += 1;
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to delete old backup");
            },
        }
    }

    Ok(deleted)
}
