//! Application configuration
//!
//! Layered as defaults, then an optional `config.toml`, then `PIHOME__*`
//! environment variables (`__` separates nesting levels, e.g.
//! `PIHOME__DAEMONS__SENSOR__MAX_TRIES=3`). Vault credentials and the node
//! location additionally honour the unprefixed variables the node images
//! are provisioned with.
//!
//! Split into focused sub-modules:
//! - `daemons`: polling schedules and the daily backup
//! - `database`: pool tuning and the vault database secret
//! - `devices`: sysfs paths for the sensor and health collectors
//! - `server`: dashboard HTTP server
//! - `vault`: AppRole login and boot-time unseal
//!
//! The REST integrations carry their own config types (`solaredge`,
//! `quotes`, `pushed`, `weather`, `ipinfo`).

mod daemons;
mod database;
mod devices;
mod server;
mod vault;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use domain::Location;
use integration_pushed::PushedConfig;
use integration_quotes::QuotesConfig;
use integration_solaredge::SolarEdgeConfig;
use integration_weather::{LocationConfig, WeatherConfig};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use daemons::{BackupConfig, DaemonsConfig, PollConfig};
pub use database::{DatabaseConfig, DatabaseSecret};
pub use devices::{SensorDeviceConfig, StatsConfig};
pub use server::ServerConfig;
pub use vault::{UnsealConfig, VaultAppConfig};

use crate::telemetry::LoggingConfig;

/// Environment variable prefix for config overrides
pub const ENV_PREFIX: &str = "PIHOME";

/// Shared default for boolean `true` fields across config structs
pub(crate) const fn default_true() -> bool {
    true
}

/// Identity of the node this process runs on
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Name used in notifications and stats; defaults to the hostname
    #[serde(default)]
    pub name: Option<String>,

    /// Room a sensor node is installed in
    #[serde(default)]
    pub location: Option<Location>,
}

impl NodeConfig {
    /// Configured name, else the hostname, else `"unknown"`
    #[must_use]
    pub fn resolved_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "unknown".to_string())
        })
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub node: NodeConfig,

    /// Where deferred writes are stashed
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub vault: VaultAppConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub daemons: DaemonsConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub sensor: SensorDeviceConfig,

    #[serde(default)]
    pub stats: StatsConfig,

    #[serde(default)]
    pub solaredge: SolarEdgeConfig,

    #[serde(default)]
    pub quotes: QuotesConfig,

    #[serde(default)]
    pub pushed: PushedConfig,

    /// OpenWeatherMap endpoint for the dashboard weather panel
    #[serde(default)]
    pub weather: WeatherConfig,

    /// ipinfo endpoint for the dashboard location panel
    #[serde(default)]
    pub ipinfo: LocationConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/pihome/xdb")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            data_dir: default_data_dir(),
            vault: VaultAppConfig::default(),
            database: DatabaseConfig::default(),
            daemons: DaemonsConfig::default(),
            server: ServerConfig::default(),
            backup: BackupConfig::default(),
            logging: LoggingConfig::default(),
            sensor: SensorDeviceConfig::default(),
            stats: StatsConfig::default(),
            solaredge: SolarEdgeConfig::default(),
            quotes: QuotesConfig::default(),
            pushed: PushedConfig::default(),
            weather: WeatherConfig::default(),
            ipinfo: LocationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `./config.toml` (if present) and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(None)
    }

    /// Load from the given file (required) or `./config.toml` (optional),
    /// then the environment
    pub fn load_from(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut config = Self::build(path, None)?;
        config.vault.apply_env();
        config.apply_location(std::env::var("LOCATION").ok());
        Ok(config)
    }

    fn build(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("config").required(false),
        };

        let builder = config::Config::builder()
            .add_source(file)
            // Override with environment variables (e.g., PIHOME__SERVER__PORT)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            );

        builder.build()?.try_deserialize()
    }

    fn apply_location(&mut self, location: Option<String>) {
        let Some(raw) = location.filter(|v| !v.trim().is_empty()) else {
            return;
        };
        match raw.parse::<Location>() {
            Ok(location) => self.node.location = Some(location),
            Err(e) => warn!(location = %raw, error = %e, "Ignoring unknown LOCATION"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    #[test]
    fn defaults_without_sources() {
        let config = AppConfig::build(None, env(&[])).unwrap();
        assert_eq!(config.vault.mount_path, "kv");
        assert_eq!(config.daemons.sensor.every_minutes, 3);
        assert_eq!(config.backup.keep_days, 3);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/pihome/xdb"));
        assert_eq!(config.weather.units, "imperial");
        assert_eq!(config.ipinfo.base_url, "https://ipinfo.io");
    }

    #[test]
    fn file_values_are_read() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
data_dir = "/tmp/xdb"

[node]
name = "sensor-attic"
location = "attic"

[daemons.quote]
every_minutes = 30
max_tries = 4
wait_secs = 1
"#
        )
        .unwrap();

        let config = AppConfig::build(Some(file.path()), env(&[])).unwrap();
        assert_eq!(config.node.resolved_name(), "sensor-attic");
        assert_eq!(config.node.location, Some(Location::Attic));
        assert_eq!(config.daemons.quote.every_minutes, 30);
        assert_eq!(config.daemons.solar.offset, 1);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/xdb"));
    }

    #[test]
    fn env_overrides_nested_keys() {
        let config = AppConfig::build(
            None,
            env(&[
                ("PIHOME__SERVER__PORT", "9090"),
                ("PIHOME__LOGGING__JSON", "true"),
                ("PIHOME__DATABASE__SQLITE_URL", "sqlite::memory:"),
                ("PIHOME__WEATHER__UNITS", "metric"),
            ]),
        )
        .unwrap();
        assert_eq!(config.server.port, 9090);
        assert!(config.logging.json);
        assert_eq!(config.database.sqlite_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(config.weather.units, "metric");
    }

    #[test]
    fn missing_required_file_fails() {
        let result = AppConfig::build(Some(Path::new("/nonexistent/pihome.toml")), env(&[]));
        assert!(result.is_err());
    }

    #[test]
    fn location_env_is_parsed_case_insensitively() {
        let mut config = AppConfig::default();
        config.apply_location(Some("Upstairs".into()));
        assert_eq!(config.node.location, Some(Location::Upstairs));

        config.apply_location(Some("garage".into()));
        assert_eq!(config.node.location, Some(Location::Upstairs));

        config.apply_location(None);
        assert_eq!(config.node.location, Some(Location::Upstairs));
    }

    #[test]
    fn resolved_name_falls_back_to_hostname() {
        let node = NodeConfig::default();
        assert!(!node.resolved_name().is_empty());
    }
}
