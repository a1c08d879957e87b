//! Table writes with deferred-write fallback
//!
//! [`DbManager`] is the single entry point the daemons use to touch the
//! relational store. Every write is first expressed as a [`WriteOp`]; if the
//! store reports itself unreachable and a pending-write store is attached,
//! the op is stashed instead of failing and the caller gets
//! [`WriteOutcome::Deferred`]. Integrity and other database errors are never
//! deferred. Reads always go straight to the store.

use std::sync::Arc;

use chrono::Local;
use domain::value_objects::Record;
use domain::DomainError;
use tracing::{debug, instrument, warn};

use crate::error::ApplicationError;
use crate::ports::{
    FetchQuery, Filter, PendingWrite, PendingWriteId, PendingWriteStorePort, StoreTarget,
    TableStorePort, WriteOp,
};

/// Result of a write issued through [`DbManager`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Rows affected in the store
    Applied(u64),
    /// Store unreachable; stashed for replay
    Deferred(PendingWriteId),
}

impl WriteOutcome {
    #[must_use]
    pub const fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
}

/// Table access for one database, optionally backed by a pending-write store
pub struct DbManager {
    store: Arc<dyn TableStorePort>,
    target: StoreTarget,
    fallback: Option<Arc<dyn PendingWriteStorePort>>,
}

impl std::fmt::Debug for DbManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbManager")
            .field("target", &self.target)
            .field("fallback", &self.fallback.is_some())
            .finish_non_exhaustive()
    }
}

impl DbManager {
    pub fn new(store: Arc<dyn TableStorePort>, target: StoreTarget) -> Self {
        Self {
            store,
            target,
            fallback: None,
        }
    }

    /// Stash writes here when the store is unreachable
    #[must_use]
    pub fn with_fallback(mut self, pending: Arc<dyn PendingWriteStorePort>) -> Self {
        self.fallback = Some(pending);
        self
    }

    pub const fn fallback_enabled(&self) -> bool {
        self.fallback.is_some()
    }

    pub const fn target(&self) -> &StoreTarget {
        &self.target
    }

    pub async fn is_connected(&self) -> bool {
        self.store.is_connected().await
    }

    /// Insert `rows`; the column list is taken from the first row
    #[instrument(skip(self, rows), fields(db = %self.target.database, rows = rows.len()))]
    pub async fn insert_data(
        &self,
        table: &str,
        rows: Vec<Record>,
    ) -> Result<WriteOutcome, ApplicationError> {
        self.execute(WriteOp::Insert {
            table: table.to_string(),
            rows,
        })
        .await
    }

    /// Update `rows` in place, matching on `key_columns`
    #[instrument(skip(self, rows), fields(db = %self.target.database, rows = rows.len()))]
    pub async fn update_data(
        &self,
        table: &str,
        rows: Vec<Record>,
        key_columns: &[&str],
    ) -> Result<WriteOutcome, ApplicationError> {
        self.execute(WriteOp::Update {
            table: table.to_string(),
            rows,
            key_columns: key_columns.iter().map(ToString::to_string).collect(),
        })
        .await
    }

    /// Insert `rows`, falling back to an update when a key already exists
    #[instrument(skip(self, rows), fields(db = %self.target.database, rows = rows.len()))]
    pub async fn insert_or_update_data(
        &self,
        table: &str,
        rows: Vec<Record>,
        key_columns: &[&str],
    ) -> Result<WriteOutcome, ApplicationError> {
        self.execute(WriteOp::InsertUpdate {
            table: table.to_string(),
            rows,
            key_columns: key_columns.iter().map(ToString::to_string).collect(),
        })
        .await
    }

    /// Delete rows matching `condition`; an empty condition empties the table
    #[instrument(skip(self, condition), fields(db = %self.target.database))]
    pub async fn delete_data(
        &self,
        table: &str,
        condition: Record,
    ) -> Result<WriteOutcome, ApplicationError> {
        self.execute(WriteOp::Delete {
            table: table.to_string(),
            condition,
        })
        .await
    }

    pub async fn fetch_data(
        &self,
        table: &str,
        query: &FetchQuery,
    ) -> Result<Vec<Record>, ApplicationError> {
        self.store.fetch(table, query).await
    }

    /// First row of `query`, if any
    pub async fn fetch_one(
        &self,
        table: &str,
        query: FetchQuery,
    ) -> Result<Option<Record>, ApplicationError> {
        let rows = self.store.fetch(table, &query.limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn count(&self, table: &str, filters: &[Filter]) -> Result<u64, ApplicationError> {
        self.store.count(table, filters).await
    }

    /// Run `op` against the store with no fallback
    pub async fn apply(&self, op: &WriteOp) -> Result<u64, ApplicationError> {
        validate(op)?;
        match op {
            WriteOp::Insert { rows, .. } if rows.is_empty() => Ok(0),
            WriteOp::Update { rows, .. } | WriteOp::InsertUpdate { rows, .. } if rows.is_empty() => {
                Ok(0)
            },
            WriteOp::Insert { table, rows } => self.store.insert(table, rows).await,
            WriteOp::Update {
                table,
                rows,
                key_columns,
            } => self.store.update(table, rows, key_columns).await,
            WriteOp::InsertUpdate {
                table,
                rows,
                key_columns,
            } => match self.store.insert(table, rows).await {
                Err(ApplicationError::Integrity(reason)) => {
                    debug!(table = %table, %reason, "Row exists, updating instead");
                    self.store.update(table, rows, key_columns).await
                },
                other => other,
            },
            WriteOp::Delete { table, condition } => self.store.delete(table, condition).await,
        }
    }

    async fn execute(&self, op: WriteOp) -> Result<WriteOutcome, ApplicationError> {
        match self.apply(&op).await {
            Ok(affected) => Ok(WriteOutcome::Applied(affected)),
            Err(e) if e.is_unavailable() => {
                let Some(pending) = &self.fallback else {
                    return Err(e);
                };
                let table = op.table().to_string();
                let kind = op.kind();
                let write = PendingWrite {
                    op,
                    target: self.target.clone(),
                    created_at: Local::now().naive_local(),
                };
                let id = pending.stash(&write).await?;
                warn!(
                    table = %table,
                    txn_type = kind,
                    id = %id,
                    error = %e,
                    "Store unavailable, write deferred"
                );
                Ok(WriteOutcome::Deferred(id))
            },
            Err(e) => Err(e),
        }
    }
}

/// Reject ops that could never succeed, before they reach the store or disk
fn validate(op: &WriteOp) -> Result<(), ApplicationError> {
    match op {
        WriteOp::Update {
            rows, key_columns, ..
        }
        | WriteOp::InsertUpdate {
            rows, key_columns, ..
        } => {
            if key_columns.is_empty() {
                return Err(DomainError::ValidationError("no key columns given".into()).into());
            }
            for row in rows {
                if let Some(missing) = key_columns.iter().find(|k| !row.contains(k)) {
                    return Err(DomainError::MissingColumn(missing.clone()).into());
                }
                if row.len() <= key_columns.len() {
                    return Err(DomainError::ValidationError(
                        "row has no columns to update".into(),
                    )
                    .into());
                }
            }
            Ok(())
        },
        WriteOp::Insert { .. } | WriteOp::Delete { .. } => Ok(()),
    }
}
