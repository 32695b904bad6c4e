//! Error types for architecture operations.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::provider::CloudProvider;

/// Result type alias for architecture operations.
pub type ArchResult<T> = Result<T, ArchError>;

/// Errors that can occur while building, checking or ordering an architecture.
#[derive(Error, Debug)]
pub enum ArchError {
    #[error("Unsupported cloud provider: {0}")]
    UnsupportedProvider(String),

    #[error("Unsupported resource type '{node_type}' for provider {provider} (node '{node_id}')")]
    UnsupportedResourceType {
        node_id: String,
        node_type: String,
        provider: CloudProvider,
    },

    #[error("Mapping of node '{node_id}' failed: {message}")]
    InvalidMapping { node_id: String, message: String },

    #[error("Unknown resource '{id}' referenced by {context}")]
    UnknownResource { id: String, context: String },

    #[error("Duplicate resource id: {0}")]
    DuplicateResource(String),

    #[error("Resource '{child}' is already contained in '{existing}', cannot also be contained in '{requested}'")]
    MultipleContainers {
        child: String,
        existing: String,
        requested: String,
    },

    #[error("Cyclic dependency detected among resources: {}", join_ids(.ids))]
    CyclicDependency { ids: BTreeSet<String> },

    #[error("Invalid rule '{rule}': {message}")]
    InvalidRule { rule: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn join_ids(ids: &BTreeSet<String>) -> String {
    ids.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
