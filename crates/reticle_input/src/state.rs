//! # Device State
//!
//! One [`DeviceState`] is a complete snapshot of a device for one frame.
//! Three of them live in a [`crate::DeviceStateBuffer`].

use std::time::Duration;

use glam::{IVec4, Mat4, Quat, Vec2, Vec3, Vec4};

use crate::device::{
    BatteryState, DeviceProfile, GestureDirection, GestureType, JoystickType, TouchId,
};

/// Location reported for a touch that is not down.
pub const INVALID_TOUCH_LOCATION: Vec2 = Vec2::new(-1.0, -1.0);

/// One button sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonSample {
    /// Held down.
    pub pressed: bool,
    /// Platform auto-repeat fired.
    pub repeat: bool,
    /// Device time stamp of the press.
    pub press_time: Duration,
}

/// One finger on a touchpad.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchSample {
    /// Platform id.
    pub id: TouchId,
    /// Normalized position, [`INVALID_TOUCH_LOCATION`] once released.
    pub position: Vec2,
    /// Low-pass filtered velocity in pad units per second.
    pub velocity: Vec2,
    /// Finger is down.
    pub valid: bool,
    /// Device time stamp of the press.
    pub press_time: Duration,
    /// Device time stamp of the release, zero while down.
    pub release_time: Duration,
}

impl TouchSample {
    pub(crate) fn pressed(id: TouchId, position: Vec2, time: Duration) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::ZERO,
            valid: true,
            press_time: time,
            release_time: Duration::ZERO,
        }
    }
}

/// Latest gesture on a touchpad.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TouchGesture {
    /// Gesture kind.
    pub gesture_type: GestureType,
    /// Fling direction.
    pub direction: GestureDirection,
    /// Displacement since the gesture started.
    pub displacement: Vec2,
    /// Gesture velocity.
    pub velocity: Vec2,
    /// Unit axis captured on `ScrollStart`, zero outside a scroll.
    pub initial_axis: Vec2,
}

/// Touches and gesture of one touchpad.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TouchpadState {
    /// Touches in press order, including ones released this frame.
    pub touches: Vec<TouchSample>,
    /// Latest gesture.
    pub gesture: TouchGesture,
}

impl TouchpadState {
    /// Looks up a touch by id.
    #[must_use]
    pub fn touch(&self, id: TouchId) -> Option<&TouchSample> {
        self.touches.iter().find(|touch| touch.id == id)
    }

    pub(crate) fn touch_mut(&mut self, id: TouchId) -> Option<&mut TouchSample> {
        self.touches.iter_mut().find(|touch| touch.id == id)
    }

    /// Ids of touches that are down, oldest first.
    pub fn active_touches(&self) -> impl Iterator<Item = TouchId> + '_ {
        self.touches
            .iter()
            .filter(|touch| touch.valid)
            .map(|touch| touch.id)
    }

    /// Oldest active touch, or the most recently released one.
    #[must_use]
    pub fn primary_touch(&self) -> Option<TouchId> {
        self.active_touches().next().or_else(|| {
            self.touches
                .iter()
                .filter(|touch| !touch.valid)
                .max_by_key(|touch| touch.release_time)
                .map(|touch| touch.id)
        })
    }
}

/// Per-eye rendering parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EyeState {
    /// Transform from head to eye space.
    pub eye_from_head: Mat4,
    /// Field of view as `(left, right, bottom, top)` half-angles in radians.
    pub fov: Vec4,
    /// Viewport as `(x, y, width, height)` in pixels.
    pub viewport: IVec4,
}

impl Default for EyeState {
    fn default() -> Self {
        Self {
            eye_from_head: Mat4::IDENTITY,
            fov: Vec4::ZERO,
            viewport: IVec4::ZERO,
        }
    }
}

/// Battery report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatteryStatus {
    /// Charging state.
    pub state: BatteryState,
    /// Charge in percent, `None` if unknown.
    pub charge: Option<u8>,
}

/// Snapshot of one device for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceState {
    /// Accumulated frame time since connect.
    pub time_stamp: Duration,
    /// One sample per profile button.
    pub buttons: Vec<ButtonSample>,
    /// Indexed by [`JoystickType::index`].
    pub joysticks: [Vec2; JoystickType::COUNT],
    /// One entry per profile touchpad.
    pub touchpads: Vec<TouchpadState>,
    /// Device position.
    pub position: Vec3,
    /// Device rotation.
    pub rotation: Quat,
    /// Per-wheel delta accumulated this frame.
    pub scroll: Vec<i32>,
    /// One entry per profile eye.
    pub eyes: Vec<EyeState>,
    /// Present when the profile reports a battery.
    pub battery: Option<BatteryStatus>,
    /// Keys pressed this frame.
    pub keys: Vec<String>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            time_stamp: Duration::ZERO,
            buttons: Vec::new(),
            joysticks: [Vec2::ZERO; JoystickType::COUNT],
            touchpads: Vec::new(),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scroll: Vec::new(),
            eyes: Vec::new(),
            battery: None,
            keys: Vec::new(),
        }
    }
}

impl DeviceState {
    /// Reference state for a freshly connected device.
    #[must_use]
    pub fn from_profile(profile: &DeviceProfile) -> Self {
        Self {
            buttons: vec![ButtonSample::default(); profile.num_buttons],
            touchpads: vec![TouchpadState::default(); profile.touchpads.len()],
            scroll: vec![0; profile.scroll_wheels],
            eyes: vec![EyeState::default(); profile.num_eyes],
            battery: profile.has_battery.then(BatteryStatus::default),
            ..Self::default()
        }
    }

    /// Clears values that only describe a single frame.
    pub(crate) fn clear_frame_deltas(&mut self) {
        self.scroll.iter_mut().for_each(|delta| *delta = 0);
        self.keys.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn released(id: TouchId, at_ms: u64) -> TouchSample {
        TouchSample {
            valid: false,
            position: INVALID_TOUCH_LOCATION,
            release_time: Duration::from_millis(at_ms),
            ..TouchSample::pressed(id, Vec2::ZERO, Duration::ZERO)
        }
    }

    #[test]
    fn test_primary_touch_prefers_oldest_active() {
        let pad = TouchpadState {
            touches: vec![
                released(1, 10),
                TouchSample::pressed(2, Vec2::splat(0.5), Duration::from_millis(5)),
                TouchSample::pressed(3, Vec2::splat(0.2), Duration::from_millis(8)),
            ],
            ..TouchpadState::default()
        };
        assert_eq!(pad.primary_touch(), Some(2));
        assert_eq!(pad.active_touches().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_primary_touch_falls_back_to_latest_release() {
        let pad = TouchpadState {
            touches: vec![released(1, 30), released(2, 10)],
            ..TouchpadState::default()
        };
        assert_eq!(pad.primary_touch(), Some(1));
        assert_eq!(TouchpadState::default().primary_touch(), None);
    }

    #[test]
    fn test_reference_state_matches_profile() {
        let state = DeviceState::from_profile(&DeviceProfile::controller_3dof());
        assert_eq!(state.buttons.len(), 3);
        assert_eq!(state.touchpads.len(), 1);
        assert!(state.battery.is_some());
        assert_eq!(state.rotation, Quat::IDENTITY);
    }
}
