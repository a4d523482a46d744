//! Unified error handling for the baeum crate
//!
//! Module-specific errors ([`RotationError`], [`ChannelError`]) stay typed at
//! their boundaries; this module wraps them into a single [`Error`] enum for
//! use across module seams, with a [`Result`] alias and helpers for
//! classifying how an error should be handled.

use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::posting::ChannelError;
pub use crate::rotation::RotationError;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (channel delivery, upstream HTTP)
    Network,
    /// Storage and I/O errors
    Storage,
    /// Rotation and selection errors
    Rotation,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

/// Unified error type for the baeum crate
#[derive(Error, Debug)]
pub enum Error {
    /// Rotation selection and state errors
    #[error("Rotation error: {0}")]
    Rotation(#[from] RotationError),

    /// Channel delivery errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Check if this error is recoverable (a later run may succeed)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Rotation(e) => e.is_recoverable(),
            Self::Channel(_) => true,
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Http(_) => true,
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Channel(_) | Self::Http(_) => ErrorCategory::Network,
            Self::Rotation(RotationError::PersistenceFailed { .. }) => ErrorCategory::Storage,
            Self::Rotation(_) => ErrorCategory::Rotation,
            Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) => ErrorCategory::Other,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

// Conversion from anyhow::Error for the binary edges
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
