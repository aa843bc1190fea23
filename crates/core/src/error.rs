//! Core error types for Gantry.
//!
//! All errors are explicit, typed, and recoverable - no panics allowed.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type shared by every Gantry crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// An endpoint name that the admin router does not know.
    #[error("unknown endpoint \"{name}\"")]
    UnknownEndpoint { name: String },

    /// An endpoint is missing a parameter required by its URL template.
    #[error("endpoint \"{endpoint}\" is missing parameter \"{param}\"")]
    MissingEndpointParam { endpoint: String, param: String },

    /// An action kind tag that does not name any entity operation.
    #[error("unknown action kind \"{kind}\"")]
    UnknownActionKind { kind: String },
}

impl Error {
    /// Create an unknown endpoint error.
    pub fn unknown_endpoint(name: impl Into<String>) -> Self {
        Self::UnknownEndpoint { name: name.into() }
    }

    /// Create a missing endpoint parameter error.
    pub fn missing_endpoint_param(endpoint: impl Into<String>, param: impl Into<String>) -> Self {
        Self::MissingEndpointParam {
            endpoint: endpoint.into(),
            param: param.into(),
        }
    }

    /// Create an unknown action kind error.
    pub fn unknown_action_kind(kind: impl Into<String>) -> Self {
        Self::UnknownActionKind { kind: kind.into() }
    }

    /// Whether this error stems from configuration rather than I/O.
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownEndpoint { .. }
                | Self::MissingEndpointParam { .. }
                | Self::UnknownActionKind { .. }
        )
    }
}
