//! Application-level errors

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The relational store could not be reached
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A write violated a unique or foreign key constraint
    #[error("Integrity violation: {0}")]
    Integrity(String),

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(String),

    /// External service error
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Requested item does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Filesystem or device I/O failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::ExternalService(_) | Self::StoreUnavailable(_) | Self::Io(_)
        )
    }

    /// `true` when a write should be deferred rather than reported
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<std::io::Error> for ApplicationError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ApplicationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
