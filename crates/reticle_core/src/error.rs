//! # Core Error Types

use thiserror::Error;

use crate::EntityId;

/// Errors raised by the core kernel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Entity is not part of the scene.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Re-parenting would create a cycle in the hierarchy.
    #[error("parenting {child} under {parent} would create a cycle")]
    HierarchyCycle {
        /// The entity being re-parented.
        child: EntityId,
        /// The requested parent.
        parent: EntityId,
    },

    /// Camera parameters cannot produce a projection.
    #[error("invalid camera: {0}")]
    InvalidCamera(String),
}

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
