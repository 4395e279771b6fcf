//! # Focus Error Types

use reticle_core::EntityId;
use thiserror::Error;

/// Errors raised while composing or running the focus pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FocusError {
    /// A required collaborator was not supplied to a builder.
    #[error("missing required collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// `FindAncestor` entity without a `HandleDescendants` ancestor.
    #[error("{0} finds its ancestor but no ancestor handles descendants")]
    NoHandlingAncestor(EntityId),

    /// Entity has no world transform.
    #[error("{0} has no transform")]
    MissingTransform(EntityId),

    /// Entity has no bounding box.
    #[error("{0} has no bounding box")]
    MissingAabb(EntityId),

    /// Configuration could not be read or failed validation.
    #[error("invalid focus config: {0}")]
    InvalidConfig(String),
}

/// Result alias for focus operations.
pub type FocusResult<T> = Result<T, FocusError>;
