//! Store error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Vector index has not been built yet")]
    IndexNotBuilt,

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Artifact I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact parse error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
