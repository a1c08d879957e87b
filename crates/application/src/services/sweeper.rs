//! Replays deferred writes once the store is reachable again
//!
//! Entries are replayed oldest first against the database recorded in each
//! entry. The first replay failure ends the sweep and leaves that entry and
//! everything after it for the next run. Replay is not idempotent: an entry
//! whose transaction partly landed before the outage will be applied again.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::{error, info, instrument, warn};

use super::db_manager::DbManager;
use super::polling::Collector;
use crate::error::ApplicationError;
use crate::ports::{PendingWriteStorePort, StoreTarget, TableStoreFactory};

/// Counts from one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub replayed: usize,
    /// Unreadable entries set aside
    pub quarantined: usize,
}

pub struct PendingWriteSweeper {
    pending: Arc<dyn PendingWriteStorePort>,
    stores: Arc<dyn TableStoreFactory>,
}

impl std::fmt::Debug for PendingWriteSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingWriteSweeper").finish_non_exhaustive()
    }
}

impl PendingWriteSweeper {
    pub fn new(pending: Arc<dyn PendingWriteStorePort>, stores: Arc<dyn TableStoreFactory>) -> Self {
        Self { pending, stores }
    }

    /// Replay every stashed write, stopping at the first failure
    #[instrument(skip(self))]
    pub async fn sweep_once(&self) -> Result<SweepReport, ApplicationError> {
        let ids = self.pending.list().await?;
        if ids.is_empty() {
            return Ok(SweepReport::default());
        }
        info!(count = ids.len(), "Replaying pending writes");

        let mut report = SweepReport::default();
        let mut managers: HashMap<StoreTarget, DbManager> = HashMap::new();

        for (index, id) in ids.iter().enumerate() {
            let write = match self.pending.load(id).await {
                Ok(write) => write,
                Err(ApplicationError::Serialization(reason)) => {
                    warn!(id = %id, %reason, "Unreadable pending write, setting aside");
                    self.pending.quarantine(id).await?;
                    report.quarantined += 1;
                    continue;
                },
                Err(e) => return Err(e),
            };

            if !managers.contains_key(&write.target) {
                // Replays never re-defer, so no fallback is attached
                let store = self.stores.open(&write.target).await?;
                managers.insert(write.target.clone(), DbManager::new(store, write.target.clone()));
            }
            let Some(db) = managers.get(&write.target) else {
                continue;
            };

            match db.apply(&write.op).await {
                Ok(affected) => {
                    self.pending.remove(id).await?;
                    report.replayed += 1;
                    info!(
                        id = %id,
                        table = write.op.table(),
                        txn_type = write.op.kind(),
                        affected,
                        "Pending write replayed"
                    );
                },
                Err(e) => {
                    error!(
                        id = %id,
                        remaining = ids.len() - index,
                        replayed = report.replayed,
                        error = %e,
                        "Could not replay pending write, will retry next sweep"
                    );
                    return Err(e);
                },
            }
        }
        Ok(report)
    }
}

#[async_trait]
impl Collector for PendingWriteSweeper {
    fn name(&self) -> &str {
        "xdb"
    }

    async fn collect(&self, _now: NaiveDateTime) -> Result<(), ApplicationError> {
        let report = self.sweep_once().await?;
        if report.replayed > 0 || report.quarantined > 0 {
            info!(replayed = report.replayed, quarantined = report.quarantined, "Sweep complete");
        }
        Ok(())
    }
}
