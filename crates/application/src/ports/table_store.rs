//! Port for row-oriented access to the relational store
//!
//! Tables are addressed by name and rows are [`Record`]s, so one adapter
//! serves every daemon's schema. Adapters report an unreachable store as
//! [`ApplicationError::StoreUnavailable`] and unique-key clashes as
//! [`ApplicationError::Integrity`]; the deferred-write path depends on that
//! distinction.

use std::sync::Arc;

use async_trait::async_trait;
use domain::value_objects::{Record, SqlValue};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::ApplicationError;

/// Comparison used by a [`Filter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl FilterOp {
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }
}

/// `column <op> value`; filters in a query are joined with `AND`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: SqlValue,
}

impl Filter {
    pub fn new(column: impl Into<String>, op: FilterOp, value: impl Into<SqlValue>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self::new(column, FilterOp::Eq, value)
    }

    /// Equality filters for every column of `condition`
    #[must_use]
    pub fn all_eq(condition: &Record) -> Vec<Self> {
        condition
            .iter()
            .map(|(column, value)| Self::eq(column, value.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// A `SELECT` against a single table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchQuery {
    /// Columns to return; empty selects every column
    pub columns: Vec<String>,
    pub filters: Vec<Filter>,
    pub order_by: Vec<(String, SortOrder)>,
    pub limit: Option<u32>,
}

impl FetchQuery {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn where_eq(self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order_by.push((column.into(), order));
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Which database (and schema) a store talks to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StoreTarget {
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_name: Option<String>,
}

impl StoreTarget {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    #[must_use]
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }
}

/// Port for table reads and writes
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TableStorePort: Send + Sync {
    /// Insert every row in one transaction; columns come from the first row
    async fn insert(&self, table: &str, rows: &[Record]) -> Result<u64, ApplicationError>;

    /// Update each row, matching on `key_columns` and setting the rest
    async fn update(
        &self,
        table: &str,
        rows: &[Record],
        key_columns: &[String],
    ) -> Result<u64, ApplicationError>;

    /// Delete rows equal to `condition` on every column; empty deletes all
    async fn delete(&self, table: &str, condition: &Record) -> Result<u64, ApplicationError>;

    async fn fetch(&self, table: &str, query: &FetchQuery) -> Result<Vec<Record>, ApplicationError>;

    async fn count(&self, table: &str, filters: &[Filter]) -> Result<u64, ApplicationError>;

    /// Lightweight liveness probe
    async fn is_connected(&self) -> bool;
}

/// Opens stores for arbitrary targets; used when replaying deferred writes
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TableStoreFactory: Send + Sync {
    async fn open(&self, target: &StoreTarget) -> Result<Arc<dyn TableStorePort>, ApplicationError>;
}
