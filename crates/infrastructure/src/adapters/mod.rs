//! Infrastructure adapters
//!
//! Adapters connect application ports to concrete implementations.

mod iio_sensor;
mod pushed_adapter;
mod quotes_adapter;
mod solaredge_adapter;
mod sysinfo_stats;
mod vault_secret_store;
mod vault_unsealer;
mod weather_adapter;

pub use iio_sensor::IioEnvironmentSensor;
pub use pushed_adapter::PushedAdapter;
pub use quotes_adapter::QuotesAdapter;
pub use solaredge_adapter::SolarEdgeAdapter;
pub use sysinfo_stats::SysinfoStatsCollector;
pub use vault_secret_store::VaultSecretStore;
pub use vault_unsealer::{SealStatus, UnsealOutcome, VaultUnsealer, wait_for_port};
pub use weather_adapter::{IPINFO_SECRET, IpinfoAdapter, OPENWEATHERMAP_SECRET, OpenWeatherAdapter};
