//! Error types for the events crate.

use thiserror::Error;

/// Result type alias for log and projection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Event error types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A response body could not be turned into an entity record.
    #[error("cannot parse {kind} response: {reason}")]
    Parse { kind: String, reason: String },

    /// Serializing the log failed.
    #[error("serialization error: {reason}")]
    Serialization { reason: String },

    /// A request descriptor was malformed.
    #[error(transparent)]
    Core(#[from] gantry_core::Error),
}

impl Error {
    /// Create a parse error.
    pub fn parse(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            kind: kind.into(),
            reason: reason.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::Serialization {
            reason: reason.into(),
        }
    }
}
