//! Error types for engine operations

use thiserror::Error;

use sitepulse_store::StoreError;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Store unavailability or a lost compare-and-set race
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Checklist item not found: {id}")]
    ItemNotFound { id: String },

    #[error("Cannot {operation} a completed item: {id}")]
    ItemCompleted { operation: String, id: String },
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
