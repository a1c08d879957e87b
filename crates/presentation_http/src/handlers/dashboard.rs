//! Dashboard panel handlers
//!
//! Each panel is polled independently; staleness flags are computed against
//! the state's clock.

use std::collections::BTreeMap;

use application::{NodeStatsView, QuoteView, SensorView, SolarView, current_time};
use axum::{Json, extract::State};
use serde::Serialize;

use crate::{error::ApiError, state::AppState};

/// Today's energy totals and the latest power flow
pub async fn solar(State(state): State<AppState>) -> Result<Json<SolarView>, ApiError> {
    Ok(Json(state.dashboard.solar(state.now()).await?))
}

/// Latest reading per room, keyed by room title
pub async fn sensors(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, SensorView>>, ApiError> {
    Ok(Json(state.dashboard.sensors(state.now()).await?))
}

/// Latest statistics per node
pub async fn stats(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, NodeStatsView>>, ApiError> {
    Ok(Json(state.dashboard.stats(state.now()).await?))
}

/// Most recent quote, `null` before the first one is stored
pub async fn quote(State(state): State<AppState>) -> Result<Json<Option<QuoteView>>, ApiError> {
    Ok(Json(state.dashboard.quote(state.now()).await?))
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeResponse {
    pub time: String,
}

/// Header clock
pub async fn time(State(state): State<AppState>) -> Json<TimeResponse> {
    Json(TimeResponse {
        time: current_time(state.now()),
    })
}
