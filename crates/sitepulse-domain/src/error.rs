//! Error types for domain operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid id: {id}")]
    InvalidId { id: String },

    #[error("Invalid status transition: {current} -> {requested}")]
    InvalidStatusTransition { current: String, requested: String },

    #[error("Unknown {kind} label: {label}")]
    UnknownLabel { kind: String, label: String },
}

/// Result type for domain operations
pub type Result<T> = std::result::Result<T, DomainError>;
