//! Notifications raised by the daemons

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::DomainError;
use crate::value_objects::Record;

/// Severity bucket shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Alert,
    Critical,
}

impl NotificationKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Alert => "alert",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "alert" => Ok(Self::Alert),
            "critical" => Ok(Self::Critical),
            other => Err(DomainError::invalid_value("type", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    #[default]
    Unread,
    Read,
}

impl NotificationStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unread => "unread",
            Self::Read => "read",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unread" => Ok(Self::Unread),
            "read" => Ok(Self::Read),
            other => Err(DomainError::InvalidStatus(other.to_string())),
        }
    }
}

/// A message from `app` on `node`; `(datetime, app, node)` identifies it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub msg: String,
    pub node: String,
    pub datetime: NaiveDateTime,
    pub kind: NotificationKind,
    pub app: String,
    pub status: NotificationStatus,
    /// Whether the push service accepted it
    pub pushed: bool,
}

impl Notification {
    pub const TABLE: &'static str = "notifications";
    pub const KEY_COLUMNS: [&'static str; 3] = ["datetime", "app", "node"];

    #[must_use]
    pub fn to_record(&self) -> Record {
        Record::new()
            .with("msg", self.msg.as_str())
            .with("node", self.node.as_str())
            .with("datetime", self.datetime)
            .with("type", self.kind.as_str())
            .with("app", self.app.as_str())
            .with("status", self.status.as_str())
            .with("pushed", self.pushed)
    }

    pub fn from_record(record: &Record) -> Result<Self, DomainError> {
        Ok(Self {
            msg: record.text("msg")?,
            node: record.text("node")?,
            datetime: record.timestamp("datetime")?,
            kind: record.text("type")?.parse()?,
            app: record.text("app")?,
            status: record.text("status")?.parse()?,
            pushed: record.boolean("pushed")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Notification {
        Notification {
            msg: "Attic humidity critical at 75%.".into(),
            node: "pisensor3".into(),
            datetime: NaiveDate::from_ymd_opt(2024, 8, 1)
                .unwrap()
                .and_hms_micro_opt(9, 30, 10, 500)
                .unwrap(),
            kind: NotificationKind::Alert,
            app: "sensor".into(),
            status: NotificationStatus::Unread,
            pushed: true,
        }
    }

    #[test]
    fn record_uses_type_column() {
        let record = sample().to_record();
        assert_eq!(record.text("type").unwrap(), "alert");
        assert!(!record.contains("kind"));
    }

    #[test]
    fn record_round_trip() {
        let n = sample();
        assert_eq!(Notification::from_record(&n.to_record()).unwrap(), n);
    }

    #[test]
    fn status_parsing() {
        assert_eq!("read".parse::<NotificationStatus>().unwrap(), NotificationStatus::Read);
        assert!("archived".parse::<NotificationStatus>().is_err());
    }
}
