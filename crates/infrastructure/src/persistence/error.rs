//! Shared error mapping for the sqlx persistence layer

use application::error::ApplicationError;

/// Postgres SQLSTATE classes that mean the server went away
const UNAVAILABLE_STATES: [&str; 4] = ["08", "53", "57P01", "57P03"];

/// Map a sqlx error to an application-layer error
///
/// Connection-level failures become `StoreUnavailable` so the write can be
/// deferred; key clashes become `Integrity`.
pub fn map_sqlx_error(e: sqlx::Error) -> ApplicationError {
    match e {
        sqlx::Error::RowNotFound => {
            ApplicationError::NotFound("Database record not found".to_string())
        },
        sqlx::Error::Database(db_err) => {
            if db_err.is_unique_violation() || db_err.is_foreign_key_violation() {
                return ApplicationError::Integrity(db_err.to_string());
            }
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            if UNAVAILABLE_STATES.iter().any(|state| code.starts_with(state)) {
                ApplicationError::StoreUnavailable(db_err.to_string())
            } else {
                ApplicationError::Database(db_err.to_string())
            }
        },
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => ApplicationError::StoreUnavailable(e.to_string()),
        sqlx::Error::Configuration(_) => ApplicationError::Configuration(e.to_string()),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            ApplicationError::Serialization(e.to_string())
        },
        other => ApplicationError::Database(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_is_unavailable() {
        assert!(map_sqlx_error(sqlx::Error::PoolTimedOut).is_unavailable());
        assert!(map_sqlx_error(sqlx::Error::PoolClosed).is_unavailable());
    }

    #[test]
    fn io_is_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(map_sqlx_error(sqlx::Error::Io(io)).is_unavailable());
    }

    #[test]
    fn row_not_found() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            ApplicationError::NotFound(_)
        ));
    }

    #[test]
    fn protocol_errors_are_plain_database_errors() {
        let err = map_sqlx_error(sqlx::Error::Protocol("bad frame".into()));
        assert!(matches!(err, ApplicationError::Database(_)));
    }
}
