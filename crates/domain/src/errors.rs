//! Domain-level errors

use thiserror::Error;

/// Errors that can occur in the domain layer
#[derive(Debug, Error)]
pub enum DomainError {
    /// A column required to build an entity is absent from the record
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A column holds a value of the wrong kind
    #[error("Invalid value for '{column}': {reason}")]
    InvalidValue { column: String, reason: String },

    /// Unknown sensor location name
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    /// Unknown notification status
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// Validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

impl DomainError {
    /// Create an invalid value error
    pub fn invalid_value(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            column: column.into(),
            reason: reason.into(),
        }
    }
}
