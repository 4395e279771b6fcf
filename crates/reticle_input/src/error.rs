//! # Input Error Types

use thiserror::Error;

use crate::device::DeviceType;

/// Errors raised by the input layer.
///
/// The per-frame query surface logs these and returns sentinels; they are
/// surfaced directly only by configuration loading and the `try_` helpers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// The device has not been connected.
    #[error("device not connected: {0}")]
    DeviceNotConnected(DeviceType),

    /// Button index outside the device profile.
    #[error("invalid button {button} for device {device}")]
    InvalidButton {
        /// Device that was queried.
        device: DeviceType,
        /// Requested button.
        button: usize,
    },

    /// Touchpad index outside the device profile.
    #[error("invalid touchpad {touchpad} for device {device}")]
    InvalidTouchpad {
        /// Device that was queried.
        device: DeviceType,
        /// Requested touchpad.
        touchpad: usize,
    },

    /// The profile does not declare the capability.
    #[error("device {device} has no {capability}")]
    MissingCapability {
        /// Device that was queried.
        device: DeviceType,
        /// Capability name, for example "position dof".
        capability: &'static str,
    },

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for input operations.
pub type InputResult<T> = Result<T, InputError>;
