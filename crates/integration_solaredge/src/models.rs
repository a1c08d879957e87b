//! SolarEdge response models

use serde::{Deserialize, Serialize};

/// Meter reported by `energyDetails`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeterType {
    Purchased,
    FeedIn,
    Consumption,
    SelfConsumption,
    Production,
    #[serde(other)]
    Unknown,
}

impl MeterType {
    /// Column of the `energy` table this meter is stored in
    #[must_use]
    pub const fn column(&self) -> Option<&'static str> {
        match self {
            Self::Purchased => Some("import"),
            Self::FeedIn => Some("export"),
            Self::Consumption => Some("consumption"),
            Self::SelfConsumption => Some("self_consumption"),
            Self::Production => Some("production"),
            Self::Unknown => None,
        }
    }
}

/// First value reported for one meter, in Wh
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeterReading {
    pub meter: MeterType,
    pub value: f64,
}

/// Meter totals for the requested period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyDetails {
    pub unit: Option<String>,
    pub meters: Vec<MeterReading>,
}

/// One side of the power flow diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    pub status: String,
    #[serde(default)]
    pub current_power: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageNode {
    pub status: String,
    #[serde(default)]
    pub current_power: f64,
    /// Percent
    #[serde(default)]
    pub charge_level: f64,
    #[serde(default)]
    pub critical: bool,
}

/// `siteCurrentPowerFlow`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentPowerFlow {
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(rename = "GRID")]
    pub grid: FlowNode,
    #[serde(rename = "LOAD")]
    pub load: FlowNode,
    #[serde(rename = "PV")]
    pub pv: FlowNode,
    #[serde(rename = "STORAGE")]
    pub storage: StorageNode,
}

// Wire shapes

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EnergyDetailsResponse {
    pub energy_details: EnergyDetailsBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnergyDetailsBody {
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub meters: Vec<MeterBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MeterBody {
    #[serde(rename = "type")]
    pub meter: MeterType,
    #[serde(default)]
    pub values: Vec<MeterValueBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MeterValueBody {
    #[serde(default)]
    pub value: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PowerFlowResponse {
    pub site_current_power_flow: CurrentPowerFlow,
}

impl From<EnergyDetailsBody> for EnergyDetails {
    fn from(body: EnergyDetailsBody) -> Self {
        let meters = body
            .meters
            .into_iter()
            .map(|m| MeterReading {
                meter: m.meter,
                value: m.values.first().and_then(|v| v.value).unwrap_or(0.0),
            })
            .collect();
        Self {
            unit: body.unit,
            meters,
        }
    }
}
