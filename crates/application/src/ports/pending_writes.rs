//! Port for deferred writes
//!
//! When the relational store is unreachable a write is captured as a
//! [`PendingWrite`] and stashed; the sweeper later lists, loads, replays and
//! removes them.

use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use domain::value_objects::Record;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use super::table_store::StoreTarget;
use crate::error::ApplicationError;

/// A write operation with everything needed to run it later
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "txn_type", content = "kwargs", rename_all = "snake_case")]
pub enum WriteOp {
    Insert {
        table: String,
        rows: Vec<Record>,
    },
    Update {
        table: String,
        rows: Vec<Record>,
        key_columns: Vec<String>,
    },
    InsertUpdate {
        table: String,
        rows: Vec<Record>,
        key_columns: Vec<String>,
    },
    Delete {
        table: String,
        condition: Record,
    },
}

impl WriteOp {
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::Insert { table, .. }
            | Self::Update { table, .. }
            | Self::InsertUpdate { table, .. }
            | Self::Delete { table, .. } => table,
        }
    }

    /// Short label for logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Insert { .. } => "insert",
            Self::Update { .. } => "update",
            Self::InsertUpdate { .. } => "insert_update",
            Self::Delete { .. } => "delete",
        }
    }
}

/// A write that could not be applied when it was issued
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingWrite {
    pub op: WriteOp,
    pub target: StoreTarget,
    pub created_at: NaiveDateTime,
}

/// Opaque handle of a stashed write
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PendingWriteId(String);

impl PendingWriteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PendingWriteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait PendingWriteStorePort: Send + Sync {
    /// Persist a write durably and return its handle
    async fn stash(&self, write: &PendingWrite) -> Result<PendingWriteId, ApplicationError>;

    /// Handles of every stashed write, oldest first
    async fn list(&self) -> Result<Vec<PendingWriteId>, ApplicationError>;

    /// Read a stashed write; a corrupt entry yields `Serialization`
    async fn load(&self, id: &PendingWriteId) -> Result<PendingWrite, ApplicationError>;

    async fn remove(&self, id: &PendingWriteId) -> Result<(), ApplicationError>;

    /// Set an unreadable entry aside so it is no longer listed
    async fn quarantine(&self, id: &PendingWriteId) -> Result<(), ApplicationError>;
}
