//! Route definitions

use axum::{
    Router,
    routing::{get, post},
};

use crate::{handlers, state::AppState};

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health and status endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        // Dashboard panels
        .route("/api/solar", get(handlers::dashboard::solar))
        .route("/api/sensors", get(handlers::dashboard::sensors))
        .route("/api/stats", get(handlers::dashboard::stats))
        .route("/api/quote", get(handlers::dashboard::quote))
        .route("/api/time", get(handlers::dashboard::time))
        .route("/api/weather", get(handlers::weather::weather))
        .route("/api/location", get(handlers::weather::location))
        // Notifications
        .route("/api/notifications", get(handlers::notifications::list))
        .route("/api/notifications/clear", post(handlers::notifications::clear))
        .route(
            "/api/notifications/clear_all",
            post(handlers::notifications::clear_all),
        )
        .with_state(state)
}
