//! # Runtime Error Types

use reticle_focus::FocusError;
use reticle_input::InputError;
use thiserror::Error;

/// Errors raised while configuring or composing the runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The runtime document could not be read or parsed.
    #[error("invalid runtime config: {0}")]
    InvalidConfig(String),

    /// A `[devices.<name>]` table names no device slot.
    #[error("unknown device slot: {0}")]
    UnknownDevice(String),

    /// Input layer rejected its configuration.
    #[error(transparent)]
    Input(#[from] InputError),

    /// Focus layer rejected its configuration or composition.
    #[error(transparent)]
    Focus(#[from] FocusError),
}

/// Result alias for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
