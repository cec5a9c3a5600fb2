//! Error types for the model layer.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building schemas, entities or resolving relationships.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Inconsistent record type or mapping registration.
    #[error("schema error: {0}")]
    Schema(String),

    /// Input that is not a well-formed property bag.
    #[error("malformed entity: {0}")]
    MalformedEntity(String),

    /// Relationship resolution failed in the bound loader.
    #[error("failed to load {property}: {message}")]
    Load { property: String, message: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
