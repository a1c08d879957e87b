//! Notification panel handlers

use application::NotificationsView;
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, state::AppState};

/// Identifies one notification; `datetime` is the `real_datetime` of the
/// listed entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearRequest {
    pub datetime: String,
    pub app: String,
    pub node: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub success: bool,
}

/// Oldest unread notifications and the unread total
pub async fn list(State(state): State<AppState>) -> Result<Json<NotificationsView>, ApiError> {
    Ok(Json(state.dashboard.notifications().await?))
}

/// Mark one notification read
pub async fn clear(
    State(state): State<AppState>,
    Json(request): Json<ClearRequest>,
) -> Result<Json<ClearResponse>, ApiError> {
    state
        .dashboard
        .clear_notification(&request.datetime, &request.app, &request.node)
        .await?;
    Ok(Json(ClearResponse { success: true }))
}

/// Mark the listed page of notifications read
pub async fn clear_all(State(state): State<AppState>) -> Result<Json<ClearResponse>, ApiError> {
    state.dashboard.clear_all().await?;
    Ok(Json(ClearResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_request_deserialization() {
        let request: ClearRequest = serde_json::from_str(
            r#"{"datetime":"20240601_093000000000","app":"solar","node":"pisolar"}"#,
        )
        .unwrap();
        assert_eq!(request.app, "solar");
        assert_eq!(request.datetime, "20240601_093000000000");
    }
}
