//! Column maps exchanged with the relational store
//!
//! A [`Record`] is one table row expressed as column name to [`SqlValue`].
//! Records are what the table store writes and reads, and what a pending
//! write file carries, so the value enum keeps enough type information for
//! timestamps and dates to survive a JSON round trip.
//!
//! ```
//! use domain::value_objects::{Record, SqlValue};
//!
//! let row = Record::new().with("location", "attic").with("temperature", 71.6);
//! assert_eq!(row.columns().collect::<Vec<_>>(), vec!["location", "temperature"]);
//! assert_eq!(row.get("location"), Some(&SqlValue::Text("attic".into())));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A single column value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqlValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
}

impl SqlValue {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view; integers widen to floats
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Boolean view; SQLite hands booleans back as 0/1 integers
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            Self::Int(0) => Some(false),
            Self::Int(1) => Some(true),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Timestamp(v) => Some(*v),
            Self::Text(v) => TIMESTAMP_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(v, fmt).ok()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(v) => Some(*v),
            Self::Timestamp(v) => Some(v.date()),
            Self::Text(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d").ok(),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
            Self::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u64> for SqlValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(Self::Float(v as f64), Self::Int)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        Self::Timestamp(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// One row: column name to value, ordered by column name
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, SqlValue>);

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    pub fn insert(
        &mut self,
        column: impl Into<String>,
        value: impl Into<SqlValue>,
    ) -> Option<SqlValue> {
        self.0.insert(column.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.0.get(column)
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn require(&self, column: &str) -> Result<&SqlValue, DomainError> {
        self.0
            .get(column)
            .ok_or_else(|| DomainError::MissingColumn(column.to_string()))
    }

    pub fn float(&self, column: &str) -> Result<f64, DomainError> {
        self.require(column)?
            .as_f64()
            .ok_or_else(|| DomainError::invalid_value(column, "expected a number"))
    }

    pub fn int(&self, column: &str) -> Result<i64, DomainError> {
        self.require(column)?
            .as_i64()
            .ok_or_else(|| DomainError::invalid_value(column, "expected an integer"))
    }

    pub fn text(&self, column: &str) -> Result<String, DomainError> {
        self.require(column)?
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| DomainError::invalid_value(column, "expected text"))
    }

    pub fn boolean(&self, column: &str) -> Result<bool, DomainError> {
        self.require(column)?
            .as_bool()
            .ok_or_else(|| DomainError::invalid_value(column, "expected a boolean"))
    }

    pub fn timestamp(&self, column: &str) -> Result<NaiveDateTime, DomainError> {
        self.require(column)?
            .as_timestamp()
            .ok_or_else(|| DomainError::invalid_value(column, "expected a timestamp"))
    }

    pub fn date(&self, column: &str) -> Result<NaiveDate, DomainError> {
        self.require(column)?
            .as_date()
            .ok_or_else(|| DomainError::invalid_value(column, "expected a date"))
    }

    /// Text column that may be absent or NULL
    pub fn optional_text(&self, column: &str) -> Result<Option<String>, DomainError> {
        match self.0.get(column) {
            None | Some(SqlValue::Null) => Ok(None),
            Some(_) => self.text(column).map(Some),
        }
    }
}

impl FromIterator<(String, SqlValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, SqlValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, SqlValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, SqlValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
