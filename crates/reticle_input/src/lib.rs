//! # RETICLE Input
//!
//! Per-device input state for the focus pipeline:
//! - [`DeviceProfile`]: what a device can report
//! - [`DeviceStateBuffer`]: triple-buffered [`DeviceState`] with frame advance
//! - [`InputManager`]: typed update/query surface over every device slot
//! - [`ButtonState`]: press transitions derived from two consecutive frames
//!
//! ## Architecture Rules
//!
//! 1. **Writers lock, readers do not** - `update_*` calls share one mutex,
//!    queries only touch published slots
//! 2. **Advance is exclusive** - `advance_frame` must not overlap queries or updates
//! 3. **Misuse degrades** - bad device or capability logs and returns a sentinel

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod button;
pub mod config;
pub mod device;
pub mod error;
pub mod manager;
pub mod state;

pub use buffer::DeviceStateBuffer;
pub use button::{derive_button_state, ButtonState, PressTiming};
pub use config::InputConfig;
pub use device::{
    BatteryState, ButtonId, ControllerType, DeviceProfile, DeviceType, DofType, EyeId,
    GestureDirection, GestureType, JoystickType, TouchId, TouchpadId, TouchpadProfile,
};
pub use error::{InputError, InputResult};
pub use manager::InputManager;
pub use state::{
    BatteryStatus, ButtonSample, DeviceState, EyeState, TouchGesture, TouchSample, TouchpadState,
    INVALID_TOUCH_LOCATION,
};
