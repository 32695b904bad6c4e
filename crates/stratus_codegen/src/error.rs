//! Error types for code generation.

use thiserror::Error;

/// Result type alias for codegen operations.
pub type CodegenResult<T> = Result<T, CodegenError>;

/// Errors that can occur during code generation.
#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("Unknown engine: {0}")]
    UnknownEngine(String),

    #[error("Engine '{0}' is already registered")]
    DuplicateEngine(String),

    #[error("Engine name must not be empty")]
    InvalidEngineName,

    #[error("Duplicate output path: {0}")]
    DuplicatePath(String),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),

    #[error("Failed to render resource '{resource}': {message}")]
    Render { resource: String, message: String },

    #[error("Resource '{resource}' is emitted before '{missing}' which it requires")]
    OrderViolation { resource: String, missing: String },

    #[error("Dependency resolution failed: {0}")]
    Resolve(#[from] stratus_arch::ArchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
