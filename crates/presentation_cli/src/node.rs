//! Start-up shared by the node daemons
//!
//! Every daemon connects to the vault first, then opens the database of its
//! role. Writes go through a [`DbManager`] that stashes them in the data
//! directory while that database is unreachable.

use std::sync::Arc;

use anyhow::{Context, Result};
use application::ports::{
    PendingWriteStorePort, SecretStoreExt, SecretStorePort, StoreTarget, TableStoreFactory,
};
use application::{DbManager, NotificationService};
use infrastructure::{AppConfig, FilePendingWriteStore, PushedAdapter, VaultSecretStore, store_factory};
use integration_pushed::PushedCredentials;
use tracing::info;

use crate::signal::shutdown_signal;

/// Which database a component writes to, and the name it connects as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Sensor,
    Solar,
    Quote,
    Health,
    Notify,
}

impl Role {
    /// Vault root and database name
    pub const fn database(self) -> &'static str {
        match self {
            Self::Sensor => "sensor",
            Self::Solar => "solar",
            Self::Quote => "quote",
            Self::Health | Self::Notify => "report",
        }
    }

    pub const fn application_name(self) -> &'static str {
        match self {
            Self::Sensor => "SensorMgr",
            Self::Solar => "SolarMgr",
            Self::Quote => "QOTDMgr",
            Self::Health => "HealthMgr",
            Self::Notify => "NotifyMgr",
        }
    }

    pub fn target(self) -> StoreTarget {
        StoreTarget::new(self.database()).with_application_name(self.application_name())
    }

    /// Vault path of a secret kept under this role
    pub fn secret(self, name: &str) -> String {
        format!("{}/{name}", self.database())
    }
}

pub struct Node {
    pub config: AppConfig,
    pub name: String,
    secrets: Arc<dyn SecretStorePort>,
    stores: Arc<dyn TableStoreFactory>,
    pending: Arc<FilePendingWriteStore>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("data_dir", &self.pending.dir())
            .finish_non_exhaustive()
    }
}

impl Node {
    /// Connect to the vault (retrying while it is unreachable) and open the
    /// store factory; `None` when a shutdown signal arrived first
    pub async fn connect(config: AppConfig) -> Result<Option<Self>> {
        info!(address = %config.vault.address, "Attempting to connect to vault");
        let vault = tokio::select! {
            result = VaultSecretStore::connect_with_retry(&config.vault) => {
                result.context("Could not connect to vault")?
            },
            () = shutdown_signal() => {
                info!("Exit signal received while connecting to vault");
                return Ok(None);
            },
        };
        let secrets: Arc<dyn SecretStorePort> = Arc::new(vault);
        let stores = store_factory(&config.database, Arc::clone(&secrets))
            .await
            .context("Could not set up the database connections")?;

        Ok(Some(Self::new(config, secrets, stores)))
    }

    pub fn new(
        config: AppConfig,
        secrets: Arc<dyn SecretStorePort>,
        stores: Arc<dyn TableStoreFactory>,
    ) -> Self {
        let pending = Arc::new(FilePendingWriteStore::new(&config.data_dir));
        Self {
            name: config.node.resolved_name(),
            config,
            secrets,
            stores,
            pending,
        }
    }

    pub fn secrets(&self) -> &dyn SecretStorePort {
        self.secrets.as_ref()
    }

    pub fn stores(&self) -> Arc<dyn TableStoreFactory> {
        Arc::clone(&self.stores)
    }

    pub fn pending(&self) -> Arc<dyn PendingWriteStorePort> {
        Arc::clone(&self.pending) as Arc<dyn PendingWriteStorePort>
    }

    /// Database access for `role`, deferring writes while it is down
    pub async fn db(&self, role: Role) -> Result<Arc<DbManager>> {
        let target = role.target();
        let store = self
            .stores
            .open(&target)
            .await
            .with_context(|| format!("Could not open the {} database", role.database()))?;
        Ok(Arc::new(DbManager::new(store, target).with_fallback(self.pending())))
    }

    /// Push notifications recorded in the report database
    pub async fn notifier(&self) -> Result<Arc<NotificationService>> {
        let credentials: PushedCredentials = self
            .secrets
            .get_typed(&Role::Notify.secret("pushed"))
            .await
            .context("Could not read push credentials")?;
        let push = PushedAdapter::with_config(&self.config.pushed, credentials)?;
        let db = self.db(Role::Notify).await?;
        Ok(Arc::new(NotificationService::new(
            Arc::new(push),
            db,
            self.name.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_share_the_report_database() {
        assert_eq!(Role::Health.database(), "report");
        assert_eq!(Role::Notify.database(), "report");
        assert_ne!(
            Role::Health.application_name(),
            Role::Notify.application_name()
        );
    }

    #[test]
    fn targets_carry_application_name() {
        let target = Role::Quote.target();
        assert_eq!(target.database, "quote");
        assert_eq!(target.application_name.as_deref(), Some("QOTDMgr"));
        assert!(target.schema.is_none());
    }

    #[test]
    fn secret_paths_live_under_the_role() {
        assert_eq!(Role::Solar.secret("solaredge"), "solar/solaredge");
        assert_eq!(Role::Notify.secret("pushed"), "report/pushed");
    }
}
