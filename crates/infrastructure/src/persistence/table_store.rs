//! sqlx implementations of [`TableStorePort`]
//!
//! [`PgTableStore`] serves the node databases; [`SqliteTableStore`] backs
//! local development and the test suites. Both run the same statements from
//! [`super::sql`] and differ only in how result rows are decoded.

use application::ApplicationError;
use application::ports::{FetchQuery, Filter, TableStorePort};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use domain::value_objects::{Record, SqlValue};
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Postgres, Row, Sqlite, TypeInfo, ValueRef};
use tracing::{debug, instrument};

use super::error::map_sqlx_error;
use super::sql::{self, Statement};

macro_rules! sql_table_store {
    ($(#[$meta:meta])* $name:ident, $db:ty, $decode:path) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            pool: sqlx::Pool<$db>,
        }

        impl $name {
            pub const fn new(pool: sqlx::Pool<$db>) -> Self {
                Self { pool }
            }

            pub const fn pool(&self) -> &sqlx::Pool<$db> {
                &self.pool
            }

            fn query<'q>(
                stmt: &'q Statement,
            ) -> sqlx::query::Query<'q, $db, <$db as sqlx::Database>::Arguments<'q>> {
                let mut query = sqlx::query(&stmt.sql);
                for value in &stmt.params {
                    query = match value {
                        SqlValue::Null => query.bind(None::<String>),
                        SqlValue::Bool(v) => query.bind(*v),
                        SqlValue::Int(v) => query.bind(*v),
                        SqlValue::Float(v) => query.bind(*v),
                        SqlValue::Text(v) => query.bind(v.as_str()),
                        SqlValue::Timestamp(v) => query.bind(*v),
                        SqlValue::Date(v) => query.bind(*v),
                    };
                }
                query
            }

            /// Run `statements` in one transaction, summing affected rows
            async fn execute_all(&self, statements: &[Statement]) -> Result<u64, ApplicationError> {
                let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
                let mut affected = 0;
                for stmt in statements {
                    debug!(sql = %stmt.sql, "Executing");
                    affected += Self::query(stmt)
                        .execute(&mut *tx)
                        .await
                        .map_err(map_sqlx_error)?
                        .rows_affected();
                }
                tx.commit().await.map_err(map_sqlx_error)?;
                Ok(affected)
            }
        }

        #[async_trait]
        impl TableStorePort for $name {
            #[instrument(skip(self, rows), fields(rows = rows.len()))]
            async fn insert(&self, table: &str, rows: &[Record]) -> Result<u64, ApplicationError> {
                let columns = sql::batch_columns(rows);
                let statements = rows
                    .iter()
                    .map(|row| sql::insert(table, &columns, row))
                    .collect::<Result<Vec<_>, _>>()?;
                self.execute_all(&statements).await
            }

            #[instrument(skip(self, rows), fields(rows = rows.len()))]
            async fn update(
                &self,
                table: &str,
                rows: &[Record],
                key_columns: &[String],
            ) -> Result<u64, ApplicationError> {
                let statements = rows
                    .iter()
                    .map(|row| sql::update(table, row, key_columns))
                    .collect::<Result<Vec<_>, _>>()?;
                self.execute_all(&statements).await
            }

            #[instrument(skip(self, condition))]
            async fn delete(&self, table: &str, condition: &Record) -> Result<u64, ApplicationError> {
                let stmt = sql::delete(table, condition)?;
                self.execute_all(std::slice::from_ref(&stmt)).await
            }

            #[instrument(skip(self, query))]
            async fn fetch(
                &self,
                table: &str,
                query: &FetchQuery,
            ) -> Result<Vec<Record>, ApplicationError> {
                let stmt = sql::select(table, query)?;
                let rows = Self::query(&stmt)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;
                rows.iter().map($decode).collect()
            }

            #[instrument(skip(self, filters))]
            async fn count(&self, table: &str, filters: &[Filter]) -> Result<u64, ApplicationError> {
                let stmt = sql::count(table, filters)?;
                let row = Self::query(&stmt)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;
                let count: i64 = row.try_get(0).map_err(map_sqlx_error)?;
                Ok(u64::try_from(count).unwrap_or_default())
            }

            async fn is_connected(&self) -> bool {
                sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
            }
        }
    };
}

sql_table_store!(
    /// Table store on a Postgres pool
    PgTableStore,
    Postgres,
    decode_pg_row
);

sql_table_store!(
    /// Table store on a SQLite pool
    SqliteTableStore,
    Sqlite,
    decode_sqlite_row
);

fn decode_pg_row(row: &PgRow) -> Result<Record, ApplicationError> {
    row.columns()
        .iter()
        .map(|column| {
            let i = column.ordinal();
            let value = match column.type_info().name() {
                "BOOL" => row.try_get::<Option<bool>, _>(i).map(SqlValue::from),
                "INT2" => row
                    .try_get::<Option<i16>, _>(i)
                    .map(|v| SqlValue::from(v.map(i64::from))),
                "INT4" => row.try_get::<Option<i32>, _>(i).map(SqlValue::from),
                "INT8" => row.try_get::<Option<i64>, _>(i).map(SqlValue::from),
                "FLOAT4" => row
                    .try_get::<Option<f32>, _>(i)
                    .map(|v| SqlValue::from(v.map(f64::from))),
                "FLOAT8" => row.try_get::<Option<f64>, _>(i).map(SqlValue::from),
                "TIMESTAMP" => row.try_get::<Option<NaiveDateTime>, _>(i).map(SqlValue::from),
                "TIMESTAMPTZ" => row
                    .try_get::<Option<DateTime<Utc>>, _>(i)
                    .map(|v| SqlValue::from(v.map(|t| t.naive_utc()))),
                "DATE" => row.try_get::<Option<NaiveDate>, _>(i).map(SqlValue::from),
                _ => row.try_get::<Option<String>, _>(i).map(SqlValue::from),
            }
            .map_err(map_sqlx_error)?;
            Ok((column.name().to_string(), value))
        })
        .collect()
}

/// SQLite values carry their own storage class; the declared column type
/// only decides how integers and text are interpreted
fn decode_sqlite_row(row: &SqliteRow) -> Result<Record, ApplicationError> {
    row.columns()
        .iter()
        .map(|column| {
            let i = column.ordinal();
            let raw = row.try_get_raw(i).map_err(map_sqlx_error)?;
            if raw.is_null() {
                return Ok((column.name().to_string(), SqlValue::Null));
            }
            let storage = raw.type_info().name().to_string();
            let declared = column.type_info().name();
            let value = match (storage.as_str(), declared) {
                ("INTEGER", "BOOLEAN") => row.try_get::<bool, _>(i).map(SqlValue::from),
                ("INTEGER", _) => row.try_get::<i64, _>(i).map(SqlValue::from),
                ("REAL", _) => row.try_get::<f64, _>(i).map(SqlValue::from),
                (_, "DATETIME") => row.try_get::<NaiveDateTime, _>(i).map(SqlValue::from),
                (_, "DATE") => row.try_get::<NaiveDate, _>(i).map(SqlValue::from),
                _ => row.try_get::<String, _>(i).map(SqlValue::from),
            }
            .map_err(map_sqlx_error)?;
            Ok((column.name().to_string(), value))
        })
        .collect()
}
