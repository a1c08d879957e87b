//! Infrastructure layer - Adapters for external systems
//!
//! Implements ports defined in the application layer: the vault, the
//! relational stores and the deferred-write directory, the local sensor and
//! host statistics, and the REST integrations. Also owns configuration
//! loading and logging setup for the binaries.

pub mod adapters;
pub mod config;
pub mod persistence;
pub mod retry;
pub mod telemetry;

pub use adapters::*;
pub use config::{AppConfig, BackupConfig, DatabaseConfig, DaemonsConfig, NodeConfig, ServerConfig};
pub use persistence::{
    FilePendingWriteStore, PgStoreFactory, SqliteStoreFactory, SqliteTableStore, store_factory,
};
pub use retry::{RetryConfig, Retryable, retry};
pub use telemetry::{LoggingConfig, init_logging, log_fields};
