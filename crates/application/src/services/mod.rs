//! Application services
//!
//! The collectors driven by the node daemons, the deferred-write path they
//! all share, and the dashboard read models including the cached weather
//! and location panels.

pub mod alert_throttle;
pub mod dashboard_service;
pub mod db_manager;
pub mod health_service;
pub mod notification_service;
pub mod polling;
pub mod quote_service;
pub mod sensor_service;
pub mod solar_service;
pub mod sweeper;
pub mod weather_service;

pub use alert_throttle::AlertThrottle;
pub use dashboard_service::{
    DashboardService, NodeStatsView, NotificationView, NotificationsView, QuoteView, SensorView,
    SolarView, current_time,
};
pub use db_manager::{DbManager, WriteOutcome};
pub use health_service::HealthService;
pub use notification_service::NotificationService;
pub use polling::{AttemptPolicy, Collector, CycleOutcome, PollSchedule, PollingDaemon};
pub use quote_service::QuoteService;
pub use sensor_service::SensorService;
pub use solar_service::SolarService;
pub use sweeper::{PendingWriteSweeper, SweepReport};
pub use weather_service::{ForecastView, WeatherService, WeatherView};
