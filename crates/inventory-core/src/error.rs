use thiserror::Error;

use crate::kind::EntityKind;

/// Top-level error type for inventory operations.
///
/// Logical failures (not found, collisions, invalid input) are kept apart from
/// [`InventoryError::Backend`], which carries storage failures unchanged.
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("No {kind} found on path {filters}")]
    EntityNotFound { kind: EntityKind, filters: String },

    #[error("{kind} already exists at {path}")]
    EntityAlreadyExists { kind: EntityKind, path: String },

    #[error("Expected exactly one {kind} on path {filters} but found {count}")]
    AmbiguousResult {
        kind: EntityKind,
        count: usize,
        filters: String,
    },

    #[error("Relationship {id} not found from {source_kind} on path {filters}")]
    RelationNotFound {
        source_kind: EntityKind,
        id: String,
        filters: String,
    },

    #[error("Relationship '{label}' from {from} to {to} already exists")]
    RelationAlreadyExists {
        label: String,
        from: String,
        to: String,
    },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Cannot convert {actual} to {expected}")]
    Conversion { expected: String, actual: String },

    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Backend error ({backend}): {source}")]
    Backend {
        backend: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl InventoryError {
    /// Wrap a storage failure without translating it.
    pub fn backend(backend: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Backend {
            backend: backend.into(),
            source: source.into(),
        }
    }

    /// True for the "exactly one expected, none found" family of failures.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EntityNotFound { .. } | Self::RelationNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, InventoryError>;
