//! SolarEdge monitoring integration
//!
//! Client for the SolarEdge monitoring REST API
//! (<https://monitoringapi.solaredge.com>). Provides the day's meter totals
//! and the site's current power flow.

pub mod client;
mod models;

pub use client::{
    SolarEdgeClient, SolarEdgeConfig, SolarEdgeCredentials, SolarEdgeError, SolarEdgeHttpClient,
};
pub use models::{CurrentPowerFlow, EnergyDetails, FlowNode, MeterReading, MeterType, StorageNode};
