//! Persistence module
//!
//! sqlx table stores for Postgres and SQLite, the per-role connection
//! factories, and the file-backed store for deferred writes.

pub mod connection;
pub mod error;
pub mod pending_writes;
pub mod sql;
pub mod table_store;

pub use connection::{
    PgStoreFactory, SqliteStoreFactory, migrate, open_sqlite, pg_connect_options, secret_path,
    store_factory,
};
pub use error::map_sqlx_error;
pub use pending_writes::FilePendingWriteStore;
pub use table_store::{PgTableStore, SqliteTableStore};
