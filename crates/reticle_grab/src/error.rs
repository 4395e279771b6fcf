//! # Grab Error Types

use reticle_core::EntityId;
use reticle_input::DeviceType;
use thiserror::Error;

/// Reasons a grab cannot start or continue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrabError {
    /// The entity was never registered with this handler or coordinator.
    #[error("{0} has no grab def")]
    NoGrabDef(EntityId),

    /// The entity is registered but no input handler was attached.
    #[error("{0} has no grab input handler")]
    NoInputHandler(EntityId),

    /// Entity has no world transform.
    #[error("{0} has no transform")]
    MissingTransform(EntityId),

    /// The processor holds no focus for the device.
    #[error("no input focus for {0}")]
    MissingFocus(DeviceType),

    /// The constraint shape collapsed (zero radius, zero direction, ...).
    #[error("degenerate grab geometry on {entity}: {reason}")]
    DegenerateGeometry {
        /// Grabbed entity.
        entity: EntityId,
        /// What collapsed.
        reason: &'static str,
    },

    /// The device ray does not reach the constraint shape.
    #[error("ray misses the grab constraint of {0}")]
    RayMissed(EntityId),

    /// A def could not be parsed.
    #[error("invalid grab def: {0}")]
    InvalidDef(String),
}

/// Result alias for grab operations.
pub type GrabResult<T> = Result<T, GrabError>;
