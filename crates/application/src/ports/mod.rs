//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod pending_writes;
mod push_port;
mod quote_port;
mod secret_store;
mod sensor_port;
mod solar_port;
mod system_stats_port;
mod table_store;
mod weather_port;

#[cfg(test)]
pub use pending_writes::MockPendingWriteStorePort;
pub use pending_writes::{PendingWrite, PendingWriteId, PendingWriteStorePort, WriteOp};
#[cfg(test)]
pub use push_port::MockPushPort;
pub use push_port::PushPort;
#[cfg(test)]
pub use quote_port::MockQuotePort;
pub use quote_port::QuotePort;
#[cfg(test)]
pub use secret_store::MockSecretStorePort;
pub use secret_store::{Secret, SecretStoreExt, SecretStorePort};
#[cfg(test)]
pub use sensor_port::MockEnvironmentSensorPort;
pub use sensor_port::{EnvironmentSensorPort, SensorSample};
#[cfg(test)]
pub use solar_port::MockSolarPort;
pub use solar_port::SolarPort;
#[cfg(test)]
pub use system_stats_port::MockSystemStatsPort;
pub use system_stats_port::SystemStatsPort;
#[cfg(test)]
pub use table_store::{MockTableStoreFactory, MockTableStorePort};
pub use table_store::{
    FetchQuery, Filter, FilterOp, SortOrder, StoreTarget, TableStoreFactory, TableStorePort,
};
#[cfg(test)]
pub use weather_port::{MockLocationPort, MockWeatherPort};
pub use weather_port::{LocationPort, WeatherPort};
