//! # Devices and Profiles
//!
//! A device slot is identified by [`DeviceType`]. What the device can do is
//! described once, at connect time, by a [`DeviceProfile`]; every query is
//! checked against that profile.

use std::fmt;

use reticle_core::Ray;
use serde::{Deserialize, Serialize};

/// Index of a button within a device.
pub type ButtonId = usize;
/// Index of a touchpad within a device.
pub type TouchpadId = usize;
/// Platform-assigned id of one finger on a touchpad.
pub type TouchId = u32;
/// Index of an eye within an HMD.
pub type EyeId = usize;

/// Input device slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    /// Head-mounted display.
    Hmd,
    /// Mouse.
    Mouse,
    /// Keyboard.
    Keyboard,
    /// Primary controller (or a touchscreen phone).
    Controller,
    /// Secondary controller.
    Controller2,
    /// Tracked hand.
    Hand,
}

impl DeviceType {
    /// Number of device slots.
    pub const COUNT: usize = 6;

    /// Every device slot, in index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Hmd,
        Self::Mouse,
        Self::Keyboard,
        Self::Controller,
        Self::Controller2,
        Self::Hand,
    ];

    /// Slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Human readable name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hmd => "Hmd",
            Self::Mouse => "Mouse",
            Self::Keyboard => "Keyboard",
            Self::Controller => "Controller",
            Self::Controller2 => "Controller2",
            Self::Hand => "Hand",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a degree of freedom is produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DofType {
    /// Not reported.
    #[default]
    Unavailable,
    /// Synthesized, for example by an arm model.
    Fake,
    /// Tracked.
    Real,
}

impl DofType {
    /// True unless `Unavailable`.
    #[inline]
    #[must_use]
    pub const fn is_available(self) -> bool {
        !matches!(self, Self::Unavailable)
    }
}

/// Physical form factor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerType {
    /// Pointer with primary, secondary and system buttons.
    #[default]
    ThreeButton,
    /// Phone-style screen: touch positions are unprojected into the world.
    TouchScreen,
    /// Anything else.
    Custom,
}

/// Joystick slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoystickType {
    /// Left stick.
    Left,
    /// Right stick.
    Right,
    /// D-pad reported as a 2D value.
    DirectionalPad,
}

impl JoystickType {
    /// Number of joystick slots.
    pub const COUNT: usize = 3;

    /// Slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Touchpad gesture kinds reported by platforms with native recognizers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GestureType {
    /// No gesture in progress.
    #[default]
    None,
    /// First frame of a scroll.
    ScrollStart,
    /// Scroll continues.
    ScrollUpdate,
    /// Scroll finished.
    ScrollEnd,
    /// Quick swipe.
    Fling,
}

/// Fling direction, in touchpad space (`(0,0)` top left).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GestureDirection {
    /// No fling.
    #[default]
    None,
    /// Towards negative x.
    Left,
    /// Towards positive x.
    Right,
    /// Towards negative y.
    Up,
    /// Towards positive y.
    Down,
}

/// Battery charging state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatteryState {
    /// Not reported.
    #[default]
    Unknown,
    /// Plugged in and charging.
    Charging,
    /// Running on battery.
    Discharging,
    /// Plugged in, not charging.
    NotCharging,
    /// Fully charged.
    Full,
}

/// Per-touchpad capabilities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchpadProfile {
    /// The platform reports gestures for this pad.
    pub has_gestures: bool,
}

/// Static capability description of a connected device.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    /// Display name.
    pub name: String,
    /// Form factor.
    pub controller_type: ControllerType,
    /// Source of position data.
    pub position_dof: DofType,
    /// Source of rotation data.
    pub rotation_dof: DofType,
    /// Number of buttons.
    pub num_buttons: usize,
    /// One entry per touchpad.
    pub touchpads: Vec<TouchpadProfile>,
    /// Joysticks the device reports.
    pub joysticks: Vec<JoystickType>,
    /// Number of scroll wheels.
    pub scroll_wheels: usize,
    /// Number of eyes (HMDs).
    pub num_eyes: usize,
    /// The device reports battery state.
    pub has_battery: bool,
    /// Selection ray in device space, defaults to [`Ray::FORWARD`].
    pub selection_ray: Option<Ray>,
    /// Long press threshold override in milliseconds.
    pub long_press_ms: Option<u64>,
}

impl DeviceProfile {
    /// Stereo HMD with tracked rotation and position.
    #[must_use]
    pub fn hmd() -> Self {
        Self {
            name: "hmd".into(),
            controller_type: ControllerType::Custom,
            position_dof: DofType::Real,
            rotation_dof: DofType::Real,
            num_eyes: 2,
            ..Self::default()
        }
    }

    /// Three-button pointer with one touchpad and rotation only.
    #[must_use]
    pub fn controller_3dof() -> Self {
        Self {
            name: "controller_3dof".into(),
            rotation_dof: DofType::Real,
            num_buttons: 3,
            touchpads: vec![TouchpadProfile::default()],
            has_battery: true,
            ..Self::default()
        }
    }

    /// Tracked controller with rotation and position.
    #[must_use]
    pub fn controller_6dof() -> Self {
        Self {
            name: "controller_6dof".into(),
            position_dof: DofType::Real,
            ..Self::controller_3dof()
        }
    }

    /// Phone screen: touches become world rays through the camera.
    #[must_use]
    pub fn touchscreen() -> Self {
        Self {
            name: "touchscreen".into(),
            controller_type: ControllerType::TouchScreen,
            touchpads: vec![TouchpadProfile { has_gestures: true }],
            ..Self::default()
        }
    }

    /// Mouse with three buttons and one wheel.
    #[must_use]
    pub fn mouse() -> Self {
        Self {
            name: "mouse".into(),
            controller_type: ControllerType::Custom,
            num_buttons: 3,
            scroll_wheels: 1,
            ..Self::default()
        }
    }

    /// Keyboard, reports keys only.
    #[must_use]
    pub fn keyboard() -> Self {
        Self {
            name: "keyboard".into(),
            controller_type: ControllerType::Custom,
            ..Self::default()
        }
    }

    /// True when position is tracked, not synthesized.
    #[must_use]
    pub fn has_real_position(&self) -> bool {
        self.position_dof == DofType::Real
    }
}
