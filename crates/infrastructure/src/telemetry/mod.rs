//! Logging setup for the node binaries
//!
//! Console output always; an optional append-only log file alongside it.
//! `RUST_LOG` takes precedence over the configured filter.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Width of the `=` rule framing [`log_fields`] blocks
pub const RULE_WIDTH: usize = 80;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to open log file: {0}")]
    LogFile(#[from] std::io::Error),

    #[error("Failed to initialize subscriber: {0}")]
    Init(String),
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_filter")]
    pub filter: String,

    /// Emit JSON lines instead of human-readable text
    #[serde(default)]
    pub json: bool,

    /// Also append to this file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Raise the filter to `debug` (`-v`) or `trace` (`-vv`)
    #[must_use]
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        match verbose {
            0 => {},
            1 => self.filter = "debug".to_string(),
            _ => self.filter = "trace".to_string(),
        }
        self
    }
}

/// Install the global subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let console = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .boxed()
    };

    let file = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .with_writer(Mutex::new(file))
                    .boxed(),
            )
        },
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| TelemetryError::Init(e.to_string()))?;

    info!(filter = %config.filter, json = config.json, "Logging initialized");
    Ok(())
}

/// Render `key : value` lines with keys padded to the widest one
#[must_use]
pub fn format_fields<K, V>(fields: &[(K, V)]) -> Vec<String>
where
    K: AsRef<str>,
    V: std::fmt::Display,
{
    let width = fields
        .iter()
        .map(|(key, _)| key.as_ref().chars().count())
        .max()
        .unwrap_or(0);
    fields
        .iter()
        .map(|(key, value)| format!("   {:width$} : {value}", key.as_ref()))
        .collect()
}

/// Log aligned key/value pairs between two rules of `=`
pub fn log_fields<K, V>(fields: &[(K, V)])
where
    K: AsRef<str>,
    V: std::fmt::Display,
{
    let rule = "=".repeat(RULE_WIDTH);
    info!("{rule}");
    for line in format_fields(fields) {
        info!("{line}");
    }
    info!("{rule}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_aligned() {
        let lines = format_fields(&[("Vault", "sealed"), ("Threshold", "3")]);
        assert_eq!(lines, vec!["   Vault     : sealed", "   Threshold : 3"]);
    }

    #[test]
    fn empty_fields_render_nothing() {
        let fields: [(&str, &str); 0] = [];
        assert!(format_fields(&fields).is_empty());
    }

    #[test]
    fn verbosity_raises_filter() {
        assert_eq!(LoggingConfig::default().with_verbosity(0).filter, "info");
        assert_eq!(LoggingConfig::default().with_verbosity(1).filter, "debug");
        assert_eq!(LoggingConfig::default().with_verbosity(3).filter, "trace");
    }

    #[test]
    fn config_defaults() {
        let config: LoggingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.filter, "info");
        assert!(!config.json);
        assert!(config.file.is_none());
    }
}
