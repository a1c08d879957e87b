//! Read models for the web dashboard
//!
//! Every method takes `now` so staleness (`update_late`) is decided by the
//! caller's clock. Nothing here defers writes; the dashboard talks to the
//! store directly and surfaces errors to the HTTP layer.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use domain::entities::{
    EnergyReading, EnvironmentReading, Notification, NotificationKind, NotificationStatus,
    PowerFlow, Quote, SystemStats,
};
use domain::value_objects::Record;
use serde::Serialize;
use tracing::{info, instrument};

use super::db_manager::DbManager;
use super::quote_service::same_day;
use crate::error::ApplicationError;
use crate::ports::{FetchQuery, Filter, SortOrder};

/// Latest solar data is late after this many minutes
pub const SOLAR_LATE_MINUTES: i64 = 15;
/// Latest sensor reading is late after this many minutes
pub const SENSOR_LATE_MINUTES: i64 = 5;
/// Latest node stats are late after this many minutes
pub const STATS_LATE_MINUTES: i64 = 15;
/// Notifications shown (and cleared by "clear all") at once
pub const NOTIFICATION_PAGE: u32 = 10;

/// `datetime` format used to address a single notification
pub const NOTIFICATION_ID_FORMAT: &str = "%Y%m%d_%H%M%S%6f";
const NOTIFICATION_DISPLAY_FORMAT: &str = "%m/%d/%Y %-I:%M %p";
const CLOCK_FORMAT: &str = "%-I:%M %p";

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolarView {
    pub energy: Option<EnergyReading>,
    pub power: Option<PowerFlow>,
    pub update_late: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorView {
    pub updated: NaiveDateTime,
    #[serde(rename = "icon-class")]
    pub icon_class: &'static str,
    pub temperature: f64,
    pub humidity: f64,
    pub update_late: bool,
}

/// One node's latest stats, pre-formatted for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeStatsView {
    pub updated: NaiveDateTime,
    pub update_late: bool,
    #[serde(rename = "CPU Temperature")]
    pub cpu_temperature: String,
    #[serde(rename = "CPU Usage")]
    pub cpu_usage: String,
    #[serde(rename = "Memory Usage")]
    pub memory_usage: String,
    #[serde(rename = "Disk")]
    pub disk: String,
    #[serde(rename = "Uptime")]
    pub uptime: String,
    #[serde(rename = "Location", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteView {
    #[serde(flatten)]
    pub quote: Quote,
    pub update_late: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationView {
    pub datetime: NaiveDateTime,
    pub node: String,
    pub app: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub msg: String,
    pub display_datetime: String,
    /// Round-trips through [`DashboardService::clear_notification`]
    pub real_datetime: String,
}

impl From<Notification> for NotificationView {
    fn from(n: Notification) -> Self {
        Self {
            display_datetime: n.datetime.format(NOTIFICATION_DISPLAY_FORMAT).to_string(),
            real_datetime: n.datetime.format(NOTIFICATION_ID_FORMAT).to_string(),
            datetime: n.datetime,
            node: n.node,
            app: n.app,
            kind: n.kind,
            msg: n.msg,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationsView {
    pub notifications: Vec<NotificationView>,
    pub displayed: usize,
    pub total: u64,
}

/// Round to two decimals for display
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[allow(clippy::cast_precision_loss)]
fn gib(bytes: u64) -> f64 {
    (bytes as f64 / GIB).round()
}

impl From<(&SystemStats, NaiveDateTime)> for NodeStatsView {
    fn from((stats, now): (&SystemStats, NaiveDateTime)) -> Self {
        let is_sensor_node = stats.nodename.contains("sensor");
        Self {
            updated: stats.datetime,
            update_late: now > stats.datetime + Duration::minutes(STATS_LATE_MINUTES),
            cpu_temperature: format!("{}\u{b0} C", round2(stats.cpu_temp)),
            cpu_usage: format!("{}%", round2(stats.cpu_usage)),
            memory_usage: format!("{}%", round2(stats.mem_usage)),
            disk: format!(
                "{} GB / {} GB ({}%)",
                gib(stats.disk_usage),
                gib(stats.disk_total),
                round2(stats.disk_percent())
            ),
            uptime: title_words(&stats.uptime),
            location: stats
                .location
                .filter(|_| is_sensor_node)
                .map(|l| l.title().to_string()),
        }
    }
}

/// `UP 3 DAYS` -> `Up 3 Days`
fn title_words(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Dashboard queries over the solar, sensor, report and quote databases
pub struct DashboardService {
    solar: Arc<DbManager>,
    sensor: Arc<DbManager>,
    report: Arc<DbManager>,
    quote: Arc<DbManager>,
}

impl std::fmt::Debug for DashboardService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardService").finish_non_exhaustive()
    }
}

impl DashboardService {
    pub fn new(
        solar: Arc<DbManager>,
        sensor: Arc<DbManager>,
        report: Arc<DbManager>,
        quote: Arc<DbManager>,
    ) -> Self {
        Self {
            solar,
            sensor,
            report,
            quote,
        }
    }

    /// Today's energy totals and the latest power flow
    #[instrument(skip(self))]
    pub async fn solar(&self, now: NaiveDateTime) -> Result<SolarView, ApplicationError> {
        let energy = self
            .solar
            .fetch_one(EnergyReading::TABLE, FetchQuery::all().where_eq("date", now.date()))
            .await?
            .as_ref()
            .map(EnergyReading::from_record)
            .transpose()?;

        let [from, until] = same_day("datetime", now.date());
        let power = self
            .solar
            .fetch_one(
                PowerFlow::TABLE,
                FetchQuery::all()
                    .filter(from)
                    .filter(until)
                    .order_by("datetime", SortOrder::Desc),
            )
            .await?
            .as_ref()
            .map(PowerFlow::from_record)
            .transpose()?;

        let update_late = power.as_ref().is_none_or(|p| {
            p.datetime < now - Duration::minutes(SOLAR_LATE_MINUTES)
        });
        Ok(SolarView {
            energy,
            power,
            update_late,
        })
    }

    /// Latest reading today per location, keyed by location title
    #[instrument(skip(self))]
    pub async fn sensors(
        &self,
        now: NaiveDateTime,
    ) -> Result<BTreeMap<String, SensorView>, ApplicationError> {
        let [from, until] = same_day("datetime", now.date());
        let rows = self
            .sensor
            .fetch_data(
                EnvironmentReading::TABLE,
                &FetchQuery::all()
                    .filter(from)
                    .filter(until)
                    .order_by("datetime", SortOrder::Desc),
            )
            .await?;

        let mut views = BTreeMap::new();
        for row in &rows {
            let reading = EnvironmentReading::from_record(row)?;
            let key = reading.location.title().to_string();
            if views.contains_key(&key) {
                continue;
            }
            views.insert(
                key,
                SensorView {
                    updated: reading.datetime,
                    icon_class: reading.location.icon_class(),
                    temperature: reading.temperature,
                    humidity: reading.humidity,
                    update_late: reading.datetime
                        <= now - Duration::minutes(SENSOR_LATE_MINUTES),
                },
            );
        }
        Ok(views)
    }

    /// Latest stats today per node
    #[instrument(skip(self))]
    pub async fn stats(
        &self,
        now: NaiveDateTime,
    ) -> Result<BTreeMap<String, NodeStatsView>, ApplicationError> {
        let [from, until] = same_day("datetime", now.date());
        let rows = self
            .report
            .fetch_data(
                SystemStats::TABLE,
                &FetchQuery::all()
                    .filter(from)
                    .filter(until)
                    .order_by("datetime", SortOrder::Desc),
            )
            .await?;

        let mut views = BTreeMap::new();
        for row in &rows {
            let stats = SystemStats::from_record(row)?;
            if !views.contains_key(&stats.nodename) {
                let view = NodeStatsView::from((&stats, now));
                views.insert(stats.nodename, view);
            }
        }
        Ok(views)
    }

    /// Most recent quote; late when it is not from today
    #[instrument(skip(self))]
    pub async fn quote(&self, now: NaiveDateTime) -> Result<Option<QuoteView>, ApplicationError> {
        let row = self
            .quote
            .fetch_one(
                Quote::TABLE,
                FetchQuery::all().order_by("datetime", SortOrder::Desc),
            )
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let quote = Quote::from_record(&row)?;
        let update_late = quote.datetime.date() != now.date();
        Ok(Some(QuoteView { quote, update_late }))
    }

    /// Oldest unread notifications plus the unread total
    #[instrument(skip(self))]
    pub async fn notifications(&self) -> Result<NotificationsView, ApplicationError> {
        let unread = Filter::eq("status", NotificationStatus::Unread.as_str());
        let rows = self
            .report
            .fetch_data(
                Notification::TABLE,
                &FetchQuery::all()
                    .filter(unread.clone())
                    .order_by("datetime", SortOrder::Asc)
                    .limit(NOTIFICATION_PAGE),
            )
            .await?;
        let notifications = rows
            .iter()
            .map(|row| Notification::from_record(row).map(NotificationView::from))
            .collect::<Result<Vec<_>, _>>()?;
        let total = self.report.count(Notification::TABLE, &[unread]).await?;
        Ok(NotificationsView {
            displayed: notifications.len(),
            notifications,
            total,
        })
    }

    /// Mark one notification read; `datetime` uses [`NOTIFICATION_ID_FORMAT`]
    #[instrument(skip(self))]
    pub async fn clear_notification(
        &self,
        datetime: &str,
        app: &str,
        node: &str,
    ) -> Result<(), ApplicationError> {
        let datetime = NaiveDateTime::parse_from_str(datetime, NOTIFICATION_ID_FORMAT)
            .map_err(|e| {
                domain::DomainError::ValidationError(format!("bad datetime {datetime}: {e}"))
            })?;
        info!(%datetime, app, node, "Marking notification as read");
        self.mark_read(vec![read_key(datetime, app, node)]).await
    }

    /// Mark the oldest page of unread notifications read
    #[instrument(skip(self))]
    pub async fn clear_all(&self) -> Result<(), ApplicationError> {
        let rows = self
            .report
            .fetch_data(
                Notification::TABLE,
                &FetchQuery::all()
                    .columns(Notification::KEY_COLUMNS)
                    .where_eq("status", NotificationStatus::Unread.as_str())
                    .order_by("datetime", SortOrder::Asc)
                    .limit(NOTIFICATION_PAGE),
            )
            .await?;
        info!(count = rows.len(), "Marking notifications as read");
        let keys = rows
            .into_iter()
            .map(|row| row.with("status", NotificationStatus::Read.as_str()))
            .collect();
        self.mark_read(keys).await
    }

    async fn mark_read(&self, keys: Vec<Record>) -> Result<(), ApplicationError> {
        self.report
            .update_data(Notification::TABLE, keys, &Notification::KEY_COLUMNS)
            .await?;
        Ok(())
    }
}

fn read_key(datetime: NaiveDateTime, app: &str, node: &str) -> Record {
    Record::new()
        .with("datetime", datetime)
        .with("app", app)
        .with("node", node)
        .with("status", NotificationStatus::Read.as_str())
}

/// Wall clock for the dashboard header, e.g. `7:05 PM`
#[must_use]
pub fn current_time(now: NaiveDateTime) -> String {
    now.format(CLOCK_FORMAT).to_string()
}
