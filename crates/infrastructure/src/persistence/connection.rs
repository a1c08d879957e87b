//! Database connections
//!
//! Each daemon role reads its Postgres credentials from the vault at
//! `{role}/database`. Pools are created lazily so a node can start (and
//! defer writes) while its database server is down. A configured SQLite URL
//! replaces every role's database with one local file.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use application::ApplicationError;
use application::ports::{
    SecretStoreExt, SecretStorePort, StoreTarget, TableStoreFactory, TableStorePort,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use secrecy::ExposeSecret;
use sqlx::SqlitePool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{debug, info, instrument};

use super::error::map_sqlx_error;
use super::table_store::{PgTableStore, SqliteTableStore};
use crate::config::{DatabaseConfig, DatabaseSecret};

/// Vault path holding the connection details for `role`
pub fn secret_path(role: &str) -> String {
    format!("{role}/database")
}

/// Postgres connect options for `target` from its vault secret
///
/// The target's schema wins over the secret's; either becomes the
/// connection's `search_path`.
pub fn pg_connect_options(secret: &DatabaseSecret, target: &StoreTarget) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(&secret.hostname)
        .port(secret.port)
        .username(&secret.user)
        .password(secret.password.expose_secret())
        .database(&secret.dbname);
    if let Some(schema) = target.schema.as_ref().or(secret.schema.as_ref()) {
        options = options.options([("search_path", schema.as_str())]);
    }
    if let Some(name) = &target.application_name {
        options = options.application_name(name);
    }
    options
}

/// Opens one lazily connected Postgres pool per target
pub struct PgStoreFactory {
    secrets: Arc<dyn SecretStorePort>,
    config: DatabaseConfig,
    stores: Mutex<HashMap<StoreTarget, Arc<dyn TableStorePort>>>,
}

impl std::fmt::Debug for PgStoreFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgStoreFactory")
            .field("config", &self.config)
            .field("open", &self.stores.lock().len())
            .finish_non_exhaustive()
    }
}

impl PgStoreFactory {
    pub fn new(secrets: Arc<dyn SecretStorePort>, config: DatabaseConfig) -> Self {
        Self {
            secrets,
            config,
            stores: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl TableStoreFactory for PgStoreFactory {
    #[instrument(skip(self), fields(db = %target.database))]
    async fn open(&self, target: &StoreTarget) -> Result<Arc<dyn TableStorePort>, ApplicationError> {
        let cached = self.stores.lock().get(target).cloned();
        if let Some(store) = cached {
            return Ok(store);
        }

        let secret: DatabaseSecret = self
            .secrets
            .get_typed(&secret_path(&target.database))
            .await?;
        debug!(host = %secret.hostname, dbname = %secret.dbname, "Opening Postgres pool");
        let pool = PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .acquire_timeout(Duration::from_secs(self.config.acquire_timeout_secs))
            .connect_lazy_with(pg_connect_options(&secret, target));

        let store: Arc<dyn TableStorePort> = Arc::new(PgTableStore::new(pool));
        Ok(Arc::clone(
            self.stores.lock().entry(target.clone()).or_insert(store),
        ))
    }
}

/// Open (and optionally migrate) a SQLite database
#[instrument(skip(config))]
pub async fn open_sqlite(url: &str, config: &DatabaseConfig) -> Result<SqlitePool, ApplicationError> {
    let in_memory = url.contains(":memory:");
    let options = SqliteConnectOptions::from_str(url)
        .map_err(map_sqlx_error)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        // Each in-memory connection is its own database
        .max_connections(if in_memory { 1 } else { config.max_connections })
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(options)
        .await
        .map_err(map_sqlx_error)?;

    if !in_memory {
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await
            .map_err(map_sqlx_error)?;
    }
    if config.run_migrations {
        migrate(&pool).await?;
    }

    info!(max_connections = config.max_connections, "SQLite pool created");
    Ok(pool)
}

/// Create the node tables if they do not exist
pub async fn migrate(pool: &SqlitePool) -> Result<(), ApplicationError> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| ApplicationError::Database(format!("Migration failed: {e}")))?;
    info!("Database migrations completed");
    Ok(())
}

/// Serves every target from one SQLite database
#[derive(Debug, Clone)]
pub struct SqliteStoreFactory {
    store: Arc<SqliteTableStore>,
}

impl SqliteStoreFactory {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            store: Arc::new(SqliteTableStore::new(pool)),
        }
    }

    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self, ApplicationError> {
        Ok(Self::new(open_sqlite(url, config).await?))
    }

    pub fn store(&self) -> Arc<dyn TableStorePort> {
        Arc::clone(&self.store) as Arc<dyn TableStorePort>
    }
}

#[async_trait]
impl TableStoreFactory for SqliteStoreFactory {
    async fn open(&self, _target: &StoreTarget) -> Result<Arc<dyn TableStorePort>, ApplicationError> {
        Ok(self.store())
    }
}

/// The factory the configuration asks for
pub async fn store_factory(
    config: &DatabaseConfig,
    secrets: Arc<dyn SecretStorePort>,
) -> Result<Arc<dyn TableStoreFactory>, ApplicationError> {
    match &config.sqlite_url {
        Some(url) => {
            info!(%url, "Using local SQLite for every database");
            Ok(Arc::new(SqliteStoreFactory::connect(url, config).await?))
        },
        None => Ok(Arc::new(PgStoreFactory::new(secrets, config.clone()))),
    }
}
