//! Error types for graph building
//!
//! Store failures, malformed objects and task failures abort the visit that
//! hit them. Objects that should simply not appear in the graph are not
//! errors: resolution functions return `None` for those.

use crate::store::StoreError;

/// Errors raised while traversing objects or building the graph
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid object passed to visit: {0}")]
    InvalidObject(String),

    #[error("Malformed object returned by the store: {0}")]
    MalformedObject(String),

    #[error("Failed to convert {kind} {name}: {source}")]
    Conversion {
        kind: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Status evaluation failed for {object}: {message}")]
    Status { object: String, message: String },

    #[error("Traversal task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Graph has already been finalized")]
    Finalized,
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;
