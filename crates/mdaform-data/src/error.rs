#![forbid(unsafe_code)]

//! Errors returned by entity services.

use std::fmt;

use crate::record::RecordId;

/// Failure reported by an [`EntityService`](crate::EntityService).
///
/// Editors surface these through notifications; they never change dirty
/// state.
#[derive(Debug, Clone, PartialEq)]
pub enum DataError {
    /// No record with the given id exists.
    NotFound {
        /// Entity logical name.
        entity: &'static str,
        /// Requested id.
        id: RecordId,
    },
    /// A field value was rejected.
    Validation {
        /// Entity logical name.
        entity: &'static str,
        /// Offending field.
        field: String,
        /// Human-readable reason.
        message: String,
    },
    /// The store refused the write (duplicate, stale version, ...).
    Conflict(String),
    /// The store could not be reached.
    Unavailable(String),
    /// A record payload could not be encoded or decoded.
    Serialization(String),
}

impl DataError {
    /// Shorthand for a validation failure.
    pub fn validation(
        entity: &'static str,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation {
            entity,
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether retrying the same call could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{entity} {id} not found"),
            Self::Validation {
                entity,
                field,
                message,
            } => write!(f, "invalid {entity}.{field}: {message}"),
            Self::Conflict(msg) => write!(f, "conflict: {msg}"),
            Self::Unavailable(msg) => write!(f, "service unavailable: {msg}"),
            Self::Serialization(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for DataError {}

impl From<serde_json::Error> for DataError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for data operations.
pub type DataResult<T> = Result<T, DataError>;
