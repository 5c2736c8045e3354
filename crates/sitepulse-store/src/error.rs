//! Error types for the persistence layer

use thiserror::Error;

/// Errors that can occur in the audit store.
///
/// Only `Connection` means the store is unavailable; that is the one
/// condition callers treat as fatal to a whole run.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database connection failed or the backend is unreachable
    #[error("Store connection failed: {0}")]
    Connection(String),

    /// Backend query/write error
    #[error("Store backend error: {0}")]
    Backend(String),

    /// Row could not be (de)serialized
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Record not found
    #[error("Record not found: {id}")]
    NotFound { id: String },

    /// Compare-and-set on a checklist item's status lost the race
    #[error("Status conflict on {id}: expected {expected}, found {actual}")]
    StatusConflict {
        id: String,
        expected: String,
        actual: String,
    },

    /// Stored id is not a valid content hash
    #[error("Invalid stored id: {id}")]
    InvalidId { id: String },
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
