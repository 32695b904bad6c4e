//! Error types for the diagram graph module.

use thiserror::Error;

/// Result type alias for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors that can occur while reading a diagram.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Diagram document is empty")]
    EmptyDocument,

    #[error("Invalid diagram JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid diagram format: {0}")]
    InvalidFormat(String),
}
