//! HTTP integration tests for the dashboard router
//!
//! The router runs on top of the real services and an in-memory SQLite
//! store, with the clock pinned to noon on 2024-06-01. Weather and location
//! lookups are served by in-process fakes that count their calls.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use application::ports::{LocationPort, StoreTarget, WeatherPort};
use application::{ApplicationError, DashboardService, DbManager, WeatherService};
use async_trait::async_trait;
use axum_test::TestServer;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use domain::entities::{
    DayForecast, EnergyReading, EnvironmentReading, GeoLocation, Notification, NotificationKind,
    NotificationStatus, PowerFlow, Quote, SystemStats, WeatherReport,
};
use domain::value_objects::{Location, Record};
use infrastructure::SqliteStoreFactory;
use infrastructure::config::DatabaseConfig;
use presentation_http::{AppState, create_router};
use serde_json::{Value, json};

// ============ Test Helpers ============

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn noon() -> NaiveDateTime {
    at(12, 0)
}

/// 2024-06-01 17:00 UTC, noon in Chicago
const NOON_CDT: i64 = 1_717_261_200;

fn utc_noon() -> DateTime<Utc> {
    DateTime::from_timestamp(NOON_CDT, 0).unwrap()
}

#[derive(Default)]
struct FakeWeather {
    calls: AtomicUsize,
}

#[async_trait]
impl WeatherPort for FakeWeather {
    async fn report(&self, _latitude: f64, _longitude: f64) -> Result<WeatherReport, ApplicationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let ts = |secs| DateTime::from_timestamp(secs, 0).unwrap();
        Ok(WeatherReport {
            observed_at: ts(NOON_CDT),
            sunrise: Some(ts(NOON_CDT - 6 * 3600)),
            sunset: Some(ts(NOON_CDT + 8 * 3600)),
            temperature: 71.6,
            status: "Rain".into(),
            detailed_status: "light rain".into(),
            icon_url: "https://openweathermap.org/img/wn/10d@2x.png".into(),
            utc_offset_secs: -5 * 3600,
            forecast: (0..8)
                .map(|day| DayForecast {
                    date: ts(NOON_CDT + day * 86_400),
                    temp_min: 58.4,
                    temp_max: 77.6,
                    status: "Clouds".into(),
                    icon_url: "https://openweathermap.org/img/wn/04d.png".into(),
                })
                .collect(),
        })
    }
}

#[derive(Default)]
struct FakeLocation {
    calls: AtomicUsize,
}

#[async_trait]
impl LocationPort for FakeLocation {
    async fn locate(&self) -> Result<GeoLocation, ApplicationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GeoLocation {
            ip: "203.0.113.7".into(),
            city: Some("Chicago".into()),
            region: Some("Illinois".into()),
            loc: Some("41.8500,-87.6500".into()),
            latitude: Some(41.85),
            longitude: Some(-87.65),
            ..GeoLocation::default()
        })
    }
}

struct Harness {
    server: TestServer,
    db: Arc<DbManager>,
    weather: Arc<FakeWeather>,
    location: Arc<FakeLocation>,
}

impl Harness {
    async fn new() -> Self {
        let factory = SqliteStoreFactory::connect("sqlite::memory:", &DatabaseConfig::default())
            .await
            .expect("Failed to create in-memory database");
        let db = Arc::new(DbManager::new(factory.store(), StoreTarget::new("test")));
        let dashboard = DashboardService::new(
            Arc::clone(&db),
            Arc::clone(&db),
            Arc::clone(&db),
            Arc::clone(&db),
        );
        let weather = Arc::new(FakeWeather::default());
        let location = Arc::new(FakeLocation::default());
        let lookups = WeatherService::new(weather.clone(), location.clone());
        let state = AppState::new(Arc::new(dashboard), Arc::new(lookups))
            .with_clock(noon)
            .with_utc_clock(utc_noon);
        let server = TestServer::new(create_router(state)).expect("Failed to create test server");
        Self {
            server,
            db,
            weather,
            location,
        }
    }

    async fn insert(&self, table: &str, row: Record) {
        self.db.insert_data(table, vec![row]).await.unwrap();
    }

    async fn notify(&self, minute: u32, msg: &str) {
        let notification = Notification {
            msg: msg.to_string(),
            node: "pisensor".to_string(),
            datetime: at(9, minute),
            kind: NotificationKind::Alert,
            app: "sensor".to_string(),
            status: NotificationStatus::Unread,
            pushed: true,
        };
        self.insert(Notification::TABLE, notification.to_record()).await;
    }
}

fn power(datetime: NaiveDateTime) -> PowerFlow {
    PowerFlow {
        datetime,
        grid_status: "Active".to_string(),
        grid_power: 0.4,
        solar_status: "Active".to_string(),
        solar_power: 5.2,
        battery_status: "Charging".to_string(),
        battery_power: 2.1,
        battery_charge: 64.0,
        battery_critical: false,
        power_usage: 3.5,
    }
}

// ============ Health Endpoint Tests ============

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let harness = Harness::new().await;

    let response = harness.server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn readiness_endpoint_checks_database() {
    let harness = Harness::new().await;

    let response = harness.server.get("/ready").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["ready"], true);
}

// ============ Dashboard Panel Tests ============

#[tokio::test]
async fn solar_reports_today_and_fresh_power() {
    let harness = Harness::new().await;
    let mut energy = EnergyReading::new(noon().date());
    energy.production = 18.25;
    harness.insert(EnergyReading::TABLE, energy.to_record()).await;
    harness.insert(PowerFlow::TABLE, power(at(11, 50)).to_record()).await;
    harness.insert(PowerFlow::TABLE, power(at(11, 55)).to_record()).await;

    let response = harness.server.get("/api/solar").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["energy"]["production"], 18.25);
    assert_eq!(body["power"]["datetime"], "2024-06-01T11:55:00");
    assert_eq!(body["update_late"], false);
}

#[tokio::test]
async fn solar_without_data_is_late() {
    let harness = Harness::new().await;

    let response = harness.server.get("/api/solar").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["energy"].is_null());
    assert!(body["power"].is_null());
    assert_eq!(body["update_late"], true);
}

#[tokio::test]
async fn sensors_show_latest_reading_per_room() {
    let harness = Harness::new().await;
    for (minute, temperature, location) in [
        (40, 70.0, Location::Upstairs),
        (58, 71.5, Location::Upstairs),
        (30, 95.0, Location::Attic),
    ] {
        let reading = EnvironmentReading::new(at(11, minute), temperature, 45.0, location);
        harness
            .insert(EnvironmentReading::TABLE, reading.to_record())
            .await;
    }

    let response = harness.server.get("/api/sensors").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["Upstairs"]["temperature"], 71.5);
    assert_eq!(body["Upstairs"]["update_late"], false);
    assert_eq!(body["Attic"]["temperature"], 95.0);
    assert_eq!(body["Attic"]["update_late"], true);
    assert!(body.get("Downstairs").is_none());
}

#[tokio::test]
async fn stats_are_formatted_per_node() {
    let harness = Harness::new().await;
    let stats = SystemStats {
        nodename: "pisolar".to_string(),
        datetime: at(11, 55),
        cpu_temp: 48.312,
        cpu_usage: 12.5,
        mem_usage: 40.0,
        disk_usage: 8 * 1024 * 1024 * 1024,
        disk_total: 32 * 1024 * 1024 * 1024,
        uptime: "UP 3 DAYS".to_string(),
        location: None,
    };
    harness.insert(SystemStats::TABLE, stats.to_record()).await;

    let response = harness.server.get("/api/stats").await;

    response.assert_status_ok();
    let body: Value = response.json();
    let node = &body["pisolar"];
    assert_eq!(node["CPU Usage"], "12.5%");
    assert_eq!(node["Disk"], "8 GB / 32 GB (25%)");
    assert_eq!(node["Uptime"], "Up 3 Days");
    assert_eq!(node["update_late"], false);
}

#[tokio::test]
async fn quote_is_null_until_one_is_stored() {
    let harness = Harness::new().await;

    let response = harness.server.get("/api/quote").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body.is_null());
}

#[tokio::test]
async fn yesterdays_quote_is_late() {
    let harness = Harness::new().await;
    let quote = Quote {
        quote: "Well begun is half done.".to_string(),
        author: "Aristotle".to_string(),
        title: "Quote of the day".to_string(),
        datetime: at(6, 0) - chrono::Duration::days(1),
    };
    harness.insert(Quote::TABLE, quote.to_record()).await;

    let response = harness.server.get("/api/quote").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["author"], "Aristotle");
    assert_eq!(body["update_late"], true);
}

#[tokio::test]
async fn time_uses_twelve_hour_clock() {
    let harness = Harness::new().await;

    let response = harness.server.get("/api/time").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["time"], "12:00 PM");
}

// ============ Notification Tests ============

#[tokio::test]
async fn notifications_list_oldest_first() {
    let harness = Harness::new().await;
    harness.notify(30, "Humidity high").await;
    harness.notify(10, "Temperature high").await;

    let response = harness.server.get("/api/notifications").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["total"], 2);
    assert_eq!(body["displayed"], 2);
    assert_eq!(body["notifications"][0]["msg"], "Temperature high");
    assert_eq!(body["notifications"][0]["type"], "alert");
    assert_eq!(
        body["notifications"][0]["real_datetime"],
        "20240601_091000000000"
    );
}

#[tokio::test]
async fn clear_marks_one_notification_read() {
    let harness = Harness::new().await;
    harness.notify(10, "Temperature high").await;
    harness.notify(30, "Humidity high").await;

    let response = harness
        .server
        .post("/api/notifications/clear")
        .json(&json!({
            "datetime": "20240601_091000000000",
            "app": "sensor",
            "node": "pisensor",
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);

    let listed: Value = harness.server.get("/api/notifications").await.json();
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["notifications"][0]["msg"], "Humidity high");
}

#[tokio::test]
async fn clear_with_malformed_datetime_is_bad_request() {
    let harness = Harness::new().await;

    let response = harness
        .server
        .post("/api/notifications/clear")
        .json(&json!({
            "datetime": "yesterday",
            "app": "sensor",
            "node": "pisensor",
        }))
        .expect_failure()
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn clear_all_marks_the_listed_page_read() {
    let harness = Harness::new().await;
    for minute in 0..12 {
        harness.notify(minute, "Humidity high").await;
    }

    let before: Value = harness.server.get("/api/notifications").await.json();
    assert_eq!(before["total"], 12);
    assert_eq!(before["displayed"], 10);

    let response = harness.server.post("/api/notifications/clear_all").await;
    response.assert_status_ok();

    let after: Value = harness.server.get("/api/notifications").await.json();
    assert_eq!(after["total"], 2);
    assert_eq!(
        after["notifications"][0]["real_datetime"],
        "20240601_091000000000"
    );
}

// ============ Weather and Location Tests ============

#[tokio::test]
async fn weather_panel_shows_five_days() {
    let harness = Harness::new().await;

    let response = harness
        .server
        .get("/api/weather")
        .add_query_param("lat", 41.85)
        .add_query_param("lon", -87.65)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["temp"], 71.6);
    assert_eq!(body["status"], "Rain");
    assert_eq!(body["detailed_status"], "Light Rain");
    assert_eq!(body["bg_color"], "w3-blue");
    assert_eq!(body["forecast"].as_array().unwrap().len(), 5);
    assert_eq!(body["forecast"][0]["day"], "Sat\n06/01");
    assert_eq!(body["forecast"][0]["temp_min"], 58);
    assert_eq!(body["forecast"][0]["temp_max"], 78);
}

#[tokio::test]
async fn weather_is_fetched_once_per_refresh() {
    let harness = Harness::new().await;

    for _ in 0..3 {
        harness
            .server
            .get("/api/weather")
            .add_query_param("lat", 41.85)
            .add_query_param("lon", -87.65)
            .await
            .assert_status_ok();
    }

    assert_eq!(harness.weather.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn weather_without_coordinates_is_bad_request() {
    let harness = Harness::new().await;

    let response = harness
        .server
        .get("/api/weather")
        .add_query_param("lat", 41.85)
        .expect_failure()
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["code"], "bad_request");
    assert_eq!(harness.weather.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn weather_out_of_range_is_bad_request() {
    let harness = Harness::new().await;

    let response = harness
        .server
        .get("/api/weather")
        .add_query_param("lat", 95.0)
        .add_query_param("lon", -87.65)
        .expect_failure()
        .await;

    response.assert_status_bad_request();
    assert_eq!(harness.weather.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn location_panel_is_cached() {
    let harness = Harness::new().await;

    let first: Value = harness.server.get("/api/location").await.json();
    let second: Value = harness.server.get("/api/location").await.json();

    assert_eq!(first["city"], "Chicago");
    assert_eq!(first["latitude"], 41.85);
    assert_eq!(first, second);
    assert_eq!(harness.location.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let harness = Harness::new().await;

    let response = harness.server.get("/api/forecast").expect_failure().await;

    response.assert_status_not_found();
}
