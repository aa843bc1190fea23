//! Error types for the admin crate.

use thiserror::Error;

/// Result type for admin API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the admin API.
#[derive(Error, Debug)]
pub enum Error {
    /// The admin API answered with a non-success status.
    #[error("admin API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be understood.
    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },

    /// Configuration error.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// HTTP error from reqwest.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parse error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Endpoint routing error.
    #[error("core error: {0}")]
    Core(#[from] gantry_core::Error),

    /// A listed entity could not be parsed.
    #[error("parse error: {0}")]
    Events(#[from] gantry_events::Error),
}

impl Error {
    /// Create a status error.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn config_error(reason: impl Into<String>) -> Self {
        Self::ConfigError {
            reason: reason.into(),
        }
    }

    /// Whether the admin API reported the resource as missing.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}
