//! Error types for the reconciler crate.

use gantry_core::{Action, EntityKind};
use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// `ensure` is neither `present` nor `removed`.
    #[error("Invalid ensure value \"{value}\" for {entity} \"{identity}\"")]
    InvalidEnsure {
        entity: EntityKind,
        identity: String,
        value: String,
    },

    /// A desired entity has no natural key.
    #[error("{entity} is missing its identity field \"{field}\"")]
    MissingIdentity { entity: EntityKind, field: String },

    /// A nested collection that the parent kind cannot hold.
    #[error("{entity} cannot contain {collection}")]
    UnexpectedNested { entity: EntityKind, collection: String },

    /// A nested kind diffed under a parent that cannot own it.
    #[error("{entity} cannot be nested under {parent}")]
    UnexpectedParent { entity: EntityKind, parent: String },

    /// The view reported an entity it cannot resolve to an id.
    #[error("state inconsistency for {scope}: {reason}")]
    StateInconsistency { scope: String, reason: String },

    /// The transport failed to execute an action.
    #[error("action '{}' failed: {reason}", action.description())]
    Transport { action: Box<Action>, reason: String },

    /// Loading or parsing a desired-state document failed.
    #[error("invalid desired state: {reason}")]
    InvalidDocument { reason: String },

    /// Projecting the log failed.
    #[error(transparent)]
    Projection(#[from] gantry_events::Error),

    /// A request descriptor was malformed.
    #[error(transparent)]
    Core(#[from] gantry_core::Error),
}

impl Error {
    /// Create an invalid ensure error.
    pub fn invalid_ensure(
        entity: EntityKind,
        identity: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::InvalidEnsure {
            entity,
            identity: identity.into(),
            value: value.into(),
        }
    }

    /// Create a missing identity error.
    pub fn missing_identity(entity: EntityKind, field: impl Into<String>) -> Self {
        Self::MissingIdentity {
            entity,
            field: field.into(),
        }
    }

    /// Create an unexpected nested collection error.
    pub fn unexpected_nested(entity: EntityKind, collection: impl Into<String>) -> Self {
        Self::UnexpectedNested {
            entity,
            collection: collection.into(),
        }
    }

    /// Create an unexpected parent error.
    pub fn unexpected_parent(entity: EntityKind, parent: impl ToString) -> Self {
        Self::UnexpectedParent {
            entity,
            parent: parent.to_string(),
        }
    }

    /// Create a state inconsistency error.
    pub fn state_inconsistency(scope: impl ToString, reason: impl Into<String>) -> Self {
        Self::StateInconsistency {
            scope: scope.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a transport error carrying the failing action.
    pub fn transport(action: Action, reason: impl Into<String>) -> Self {
        Self::Transport {
            action: Box::new(action),
            reason: reason.into(),
        }
    }

    /// Create an invalid document error.
    pub fn invalid_document(reason: impl Into<String>) -> Self {
        Self::InvalidDocument {
            reason: reason.into(),
        }
    }

    /// Configuration errors are raised before any request is made.
    pub const fn is_configuration(&self) -> bool {
        match self {
            Self::InvalidEnsure { .. }
            | Self::MissingIdentity { .. }
            | Self::UnexpectedNested { .. }
            | Self::UnexpectedParent { .. }
            | Self::InvalidDocument { .. } => true,
            Self::Core(err) => err.is_configuration(),
            Self::StateInconsistency { .. } | Self::Transport { .. } | Self::Projection(_) => {
                false
            }
        }
    }

    /// The action that failed, for transport errors.
    pub fn failed_action(&self) -> Option<&Action> {
        match self {
            Self::Transport { action, .. } => Some(&**action),
            _ => None,
        }
    }
}
