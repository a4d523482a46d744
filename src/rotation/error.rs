//! Error types for the rotation module

use std::fmt;

/// Result type for rotation operations
pub type RotationResult<T> = Result<T, RotationError>;

/// Rotation-specific errors
#[derive(Debug)]
pub enum RotationError {
    /// The catalog has no topics at all
    CatalogEmpty,

    /// A manually requested topic id does not exist in the catalog
    TopicNotFound {
        id: String,
    },

    /// Failed to read or write a durable rotation record
    PersistenceFailed {
        path: String,
        reason: String,
    },

    /// Serialization/deserialization error
    SerializationError {
        reason: String,
    },
}

impl fmt::Display for RotationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CatalogEmpty => {
                write!(f, "Catalog has no topics to select from")
            }
            Self::TopicNotFound { id } => {
                write!(f, "Topic not found in catalog: '{}'", id)
            }
            Self::PersistenceFailed { path, reason } => {
                write!(f, "Failed to persist '{}': {}", path, reason)
            }
            Self::SerializationError { reason } => {
                write!(f, "Serialization error: {}", reason)
            }
        }
    }
}

impl std::error::Error for RotationError {}

impl From<serde_json::Error> for RotationError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError {
            reason: err.to_string(),
        }
    }
}

impl RotationError {
    /// Create a topic-not-found error
    pub fn topic_not_found(id: impl Into<String>) -> Self {
        Self::TopicNotFound { id: id.into() }
    }

    /// Create a persistence error with the path that failed
    pub fn persistence_failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PersistenceFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Check if the error is recoverable (the next run may succeed)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PersistenceFailed { .. } | Self::SerializationError { .. }
        )
    }
}
