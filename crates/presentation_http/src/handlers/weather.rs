//! Weather and location panel handlers

use application::WeatherView;
use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use domain::entities::GeoLocation;
use serde::Deserialize;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WeatherQuery {
    pub lat: f64,
    pub lon: f64,
}

/// Current conditions and the five-day forecast at `lat`/`lon`
pub async fn weather(
    State(state): State<AppState>,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> Result<Json<WeatherView>, ApiError> {
    let Query(point) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(Json(
        state
            .weather
            .weather(point.lat, point.lon, state.utc_now())
            .await?,
    ))
}

/// Geolocation of the house's public address
pub async fn location(State(state): State<AppState>) -> Result<Json<GeoLocation>, ApiError> {
    Ok(Json(state.weather.location(state.utc_now()).await?))
}
