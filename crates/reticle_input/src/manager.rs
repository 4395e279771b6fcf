//! # Input Manager
//!
//! Owns one [`DeviceStateBuffer`] per connected device.
//!
//! ```text
//! Producer threads ──► update_*  ──► write_lock ──► front slot
//! Frame thread     ──► advance_frame                (rotate every device)
//! Any thread       ──► queries   ──────────────────► current / previous
//! ```
//!
//! ## Thread Safety
//!
//! - `update_*` calls are serialized by one mutex, held for the duration of
//!   a single call.
//! - Queries never take that mutex.
//! - `advance_frame` must not run concurrently with queries or updates. This
//!   is a documented precondition, not enforced.
//!
//! Queries against a disconnected device, or a capability the profile does
//! not declare, log a warning and return a sentinel value.

use std::time::Duration;

use glam::{IVec4, Mat4, Quat, Vec2, Vec3, Vec4};
use parking_lot::{Mutex, RwLock};
use reticle_core::Ray;

use crate::buffer::DeviceStateBuffer;
use crate::button::{derive_button_state, ButtonState, PressTiming};
use crate::config::InputConfig;
use crate::device::{
    BatteryState, ButtonId, DeviceProfile, DeviceType, EyeId, GestureDirection, GestureType,
    JoystickType, TouchId, TouchpadId,
};
use crate::error::{InputError, InputResult};
use crate::state::{
    BatteryStatus, ButtonSample, DeviceState, TouchGesture, TouchSample, TouchpadState,
    INVALID_TOUCH_LOCATION,
};

struct Device {
    kind: DeviceType,
    profile: DeviceProfile,
    buffer: DeviceStateBuffer,
    long_press: Duration,
}

impl Device {
    fn require(&self, present: bool, capability: &'static str) -> InputResult<()> {
        if present {
            Ok(())
        } else {
            Err(InputError::MissingCapability {
                device: self.kind,
                capability,
            })
        }
    }

    fn check_button(&self, button: ButtonId) -> InputResult<()> {
        if button < self.profile.num_buttons {
            Ok(())
        } else {
            Err(InputError::InvalidButton {
                device: self.kind,
                button,
            })
        }
    }

    fn check_touchpad(&self, touchpad: TouchpadId) -> InputResult<bool> {
        self.profile
            .touchpads
            .get(touchpad)
            .map(|pad| pad.has_gestures)
            .ok_or(InputError::InvalidTouchpad {
                device: self.kind,
                touchpad,
            })
    }

    fn check_eye(&self, eye: EyeId) -> InputResult<()> {
        self.require(eye < self.profile.num_eyes, "such eye")
    }
}

fn held_for(sample: &ButtonSample, time_stamp: Duration) -> Duration {
    if sample.pressed {
        time_stamp.saturating_sub(sample.press_time)
    } else {
        Duration::ZERO
    }
}

fn touch_held_for(touch: Option<&TouchSample>, time_stamp: Duration) -> Duration {
    match touch {
        Some(touch) if touch.valid => time_stamp.saturating_sub(touch.press_time),
        _ => Duration::ZERO,
    }
}

fn dominant_axis(displacement: Vec2) -> Vec2 {
    if displacement == Vec2::ZERO {
        Vec2::ZERO
    } else if displacement.x.abs() >= displacement.y.abs() {
        Vec2::X
    } else {
        Vec2::Y
    }
}

fn pad(state: &DeviceState, touchpad: TouchpadId) -> Option<&TouchpadState> {
    state.touchpads.get(touchpad)
}

/// Multi-device input state with a thread-safe write path.
///
/// # Example
///
/// ```rust,ignore
/// let input = InputManager::new();
/// input.connect_device(DeviceType::Controller, DeviceProfile::controller_3dof());
///
/// // Any producer thread
/// input.update_button(DeviceType::Controller, 0, true, false);
///
/// // Frame thread
/// input.advance_frame(Duration::from_millis(16));
/// assert!(input
///     .button_state(DeviceType::Controller, 0)
///     .contains(ButtonState::JUST_PRESSED));
/// ```
pub struct InputManager {
    config: InputConfig,
    devices: [RwLock<Option<Device>>; DeviceType::COUNT],
    write_lock: Mutex<()>,
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InputManager {
    /// Creates a manager with default configuration and no devices.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(InputConfig::default())
    }

    /// Creates a manager with the given configuration.
    #[must_use]
    pub fn with_config(config: InputConfig) -> Self {
        Self {
            config,
            devices: std::array::from_fn(|_| RwLock::new(None)),
            write_lock: Mutex::new(()),
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &InputConfig {
        &self.config
    }

    // =========================================================================
    // Internal access
    // =========================================================================

    fn query<R>(&self, device: DeviceType, fallback: R, read: impl FnOnce(&Device) -> InputResult<R>) -> R {
        let slot = self.devices[device.index()].read();
        let Some(entry) = slot.as_ref() else {
            tracing::warn!(device = ?device, "query on disconnected device");
            return fallback;
        };
        match read(entry) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(device = ?device, %error, "input query rejected");
                fallback
            }
        }
    }

    fn update(&self, device: DeviceType, apply: impl FnOnce(&Device, &mut DeviceState) -> InputResult<()>) {
        let _guard = self.write_lock.lock();
        let slot = self.devices[device.index()].read();
        let Some(entry) = slot.as_ref() else {
            tracing::warn!(device = ?device, "update on disconnected device");
            return;
        };
        let mut front = entry.buffer.write();
        if let Err(error) = apply(entry, &mut *front) {
            tracing::warn!(device = ?device, %error, "input update rejected");
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Connects a device, replacing any previous connection of that slot.
    pub fn connect_device(&self, device: DeviceType, profile: DeviceProfile) {
        let long_press = profile
            .long_press_ms
            .map_or_else(|| self.config.long_press(), Duration::from_millis);
        let buffer = DeviceStateBuffer::new(&profile, &self.config);

        let _guard = self.write_lock.lock();
        let mut slot = self.devices[device.index()].write();
        if slot.is_some() {
            tracing::warn!(device = ?device, "device already connected, replacing");
        }
        tracing::debug!(device = ?device, profile = %profile.name, "device connected");
        *slot = Some(Device {
            kind: device,
            profile,
            buffer,
            long_press,
        });
    }

    /// Disconnects a device and drops its state.
    pub fn disconnect_device(&self, device: DeviceType) {
        let _guard = self.write_lock.lock();
        if self.devices[device.index()].write().take().is_some() {
            tracing::debug!(device = ?device, "device disconnected");
        } else {
            tracing::warn!(device = ?device, "disconnect of a device that is not connected");
        }
    }

    /// True if the device is connected.
    #[must_use]
    pub fn is_connected(&self, device: DeviceType) -> bool {
        self.devices[device.index()].read().is_some()
    }

    /// Copy of the profile the device connected with.
    #[must_use]
    pub fn device_profile(&self, device: DeviceType) -> Option<DeviceProfile> {
        self.devices[device.index()]
            .read()
            .as_ref()
            .map(|entry| entry.profile.clone())
    }

    /// Selection ray in device space.
    #[must_use]
    pub fn selection_ray(&self, device: DeviceType) -> Ray {
        self.query(device, Ray::FORWARD, |entry| {
            Ok(entry.profile.selection_ray.unwrap_or(Ray::FORWARD))
        })
    }

    /// Number of frames the device has been advanced since connect.
    #[must_use]
    pub fn frame_count(&self, device: DeviceType) -> u64 {
        self.query(device, 0, |entry| Ok(entry.buffer.frame_count()))
    }

    /// Rotates every connected device's buffer.
    ///
    /// Must not be called concurrently with any query or update.
    pub fn advance_frame(&self, delta_time: Duration) {
        for slot in &self.devices {
            if let Some(entry) = slot.read().as_ref() {
                entry.buffer.advance(delta_time);
            }
        }
    }

    // =========================================================================
    // Capabilities
    // =========================================================================

    /// Device reports position.
    #[must_use]
    pub fn has_position_dof(&self, device: DeviceType) -> bool {
        self.capability(device, |profile| profile.position_dof.is_available())
    }

    /// Device reports tracked (not synthesized) position.
    #[must_use]
    pub fn has_real_position_dof(&self, device: DeviceType) -> bool {
        self.capability(device, DeviceProfile::has_real_position)
    }

    /// Device reports rotation.
    #[must_use]
    pub fn has_rotation_dof(&self, device: DeviceType) -> bool {
        self.capability(device, |profile| profile.rotation_dof.is_available())
    }

    /// Device has at least one touchpad.
    #[must_use]
    pub fn has_touchpad(&self, device: DeviceType) -> bool {
        self.capability(device, |profile| !profile.touchpads.is_empty())
    }

    /// Number of touchpads.
    #[must_use]
    pub fn num_touchpads(&self, device: DeviceType) -> usize {
        self.capability(device, |profile| profile.touchpads.len())
    }

    /// Device has the joystick.
    #[must_use]
    pub fn has_joystick(&self, device: DeviceType, joystick: JoystickType) -> bool {
        self.capability(device, |profile| profile.joysticks.contains(&joystick))
    }

    /// Device has at least one scroll wheel.
    #[must_use]
    pub fn has_scroll(&self, device: DeviceType) -> bool {
        self.capability(device, |profile| profile.scroll_wheels > 0)
    }

    /// Device has the button.
    #[must_use]
    pub fn has_button(&self, device: DeviceType, button: ButtonId) -> bool {
        self.capability(device, |profile| button < profile.num_buttons)
    }

    /// Number of buttons.
    #[must_use]
    pub fn num_buttons(&self, device: DeviceType) -> usize {
        self.capability(device, |profile| profile.num_buttons)
    }

    /// Device has the eye.
    #[must_use]
    pub fn has_eye(&self, device: DeviceType, eye: EyeId) -> bool {
        self.capability(device, |profile| eye < profile.num_eyes)
    }

    /// Number of eyes.
    #[must_use]
    pub fn num_eyes(&self, device: DeviceType) -> usize {
        self.capability(device, |profile| profile.num_eyes)
    }

    /// Device reports battery state.
    #[must_use]
    pub fn has_battery(&self, device: DeviceType) -> bool {
        self.capability(device, |profile| profile.has_battery)
    }

    /// The platform recognizes gestures on this touchpad.
    #[must_use]
    pub fn is_touch_gesture_available(&self, device: DeviceType, touchpad: TouchpadId) -> bool {
        self.capability(device, |profile| {
            profile
                .touchpads
                .get(touchpad)
                .is_some_and(|pad| pad.has_gestures)
        })
    }

    /// Capability checks are silent: a disconnected device simply has nothing.
    fn capability<R: Default>(&self, device: DeviceType, check: impl FnOnce(&DeviceProfile) -> R) -> R {
        self.devices[device.index()]
            .read()
            .as_ref()
            .map_or_else(R::default, |entry| check(&entry.profile))
    }

    // =========================================================================
    // Keys
    // =========================================================================

    /// Records a key press for this frame.
    pub fn key_pressed(&self, device: DeviceType, key: &str) {
        self.update(device, |_, front| {
            front.keys.push(key.to_owned());
            Ok(())
        });
    }

    /// Keys pressed during the current frame.
    #[must_use]
    pub fn pressed_keys(&self, device: DeviceType) -> Vec<String> {
        self.query(device, Vec::new(), |entry| Ok(entry.buffer.current().keys.clone()))
    }

    // =========================================================================
    // Buttons
    // =========================================================================

    /// Sets a button's pressed and repeat flags.
    pub fn update_button(&self, device: DeviceType, button: ButtonId, pressed: bool, repeat: bool) {
        self.update(device, |entry, front| {
            entry.check_button(button)?;
            let was_pressed = entry.buffer.current().buttons[button].pressed;
            let time_stamp = front.time_stamp;
            let sample = &mut front.buttons[button];
            sample.pressed = pressed;
            sample.repeat = repeat;
            if pressed && !was_pressed {
                sample.press_time = time_stamp;
            }
            Ok(())
        });
    }

    /// State bitmask of a button for the current frame.
    #[must_use]
    pub fn button_state(&self, device: DeviceType, button: ButtonId) -> ButtonState {
        self.query(device, ButtonState::INVALID, |entry| {
            entry.check_button(button)?;
            let current = entry.buffer.current();
            let previous = entry.buffer.previous();
            let curr = &current.buttons[button];
            let prev = &previous.buttons[button];
            Ok(derive_button_state(
                curr.pressed,
                prev.pressed,
                curr.repeat,
                PressTiming {
                    long_press: entry.long_press,
                    current: held_for(curr, current.time_stamp),
                    previous: held_for(prev, previous.time_stamp),
                },
            ))
        })
    }

    /// How long the button has been held.
    ///
    /// On the release frame this is the duration of the finished press.
    #[must_use]
    pub fn button_pressed_duration(&self, device: DeviceType, button: ButtonId) -> Duration {
        self.query(device, Duration::ZERO, |entry| {
            entry.check_button(button)?;
            let current = entry.buffer.current();
            let curr = &current.buttons[button];
            if curr.pressed {
                return Ok(held_for(curr, current.time_stamp));
            }
            let previous = entry.buffer.previous();
            Ok(held_for(&previous.buttons[button], previous.time_stamp))
        })
    }

    // =========================================================================
    // Joysticks
    // =========================================================================

    /// Sets a joystick value. Components are clamped to `[-1, 1]`.
    pub fn update_joystick(&self, device: DeviceType, joystick: JoystickType, value: Vec2) {
        self.update(device, |entry, front| {
            entry.require(entry.profile.joysticks.contains(&joystick), "such joystick")?;
            let clamped = value.clamp(Vec2::NEG_ONE, Vec2::ONE);
            if clamped != value {
                tracing::error!(device = ?device, ?joystick, ?value, "joystick value out of range, clamped");
            }
            front.joysticks[joystick.index()] = clamped;
            Ok(())
        });
    }

    /// Joystick value of the current frame.
    #[must_use]
    pub fn joystick_value(&self, device: DeviceType, joystick: JoystickType) -> Vec2 {
        self.query(device, Vec2::ZERO, |entry| {
            entry.require(entry.profile.joysticks.contains(&joystick), "such joystick")?;
            Ok(entry.buffer.current().joysticks[joystick.index()])
        })
    }

    /// Joystick change since the previous frame.
    #[must_use]
    pub fn joystick_delta(&self, device: DeviceType, joystick: JoystickType) -> Vec2 {
        self.query(device, Vec2::ZERO, |entry| {
            entry.require(entry.profile.joysticks.contains(&joystick), "such joystick")?;
            let index = joystick.index();
            Ok(entry.buffer.current().joysticks[index] - entry.buffer.previous().joysticks[index])
        })
    }

    // =========================================================================
    // Touch
    // =========================================================================

    /// Reports one finger on a touchpad.
    ///
    /// A valid sample presses or moves the touch. An invalid sample releases
    /// it; releasing an unknown id does nothing. Positions are clamped to
    /// `[0, 1]`.
    pub fn update_touch(
        &self,
        device: DeviceType,
        touchpad: TouchpadId,
        touch: TouchId,
        position: Vec2,
        valid: bool,
    ) {
        self.update(device, |entry, front| {
            entry.check_touchpad(touchpad)?;
            let time_stamp = front.time_stamp;
            let pad = &mut front.touchpads[touchpad];

            if !valid {
                if let Some(sample) = pad.touch_mut(touch).filter(|sample| sample.valid) {
                    sample.valid = false;
                    sample.position = INVALID_TOUCH_LOCATION;
                    sample.release_time = time_stamp;
                }
                return Ok(());
            }

            let clamped = position.clamp(Vec2::ZERO, Vec2::ONE);
            if clamped != position {
                tracing::error!(device = ?device, touch, ?position, "touch position out of range, clamped");
            }
            let moving = pad.touch(touch).is_some_and(|sample| sample.valid);
            if moving {
                if let Some(sample) = pad.touch_mut(touch) {
                    sample.position = clamped;
                }
            } else {
                // A re-press is a new touch: it moves to the back of the press order.
                pad.touches.retain(|sample| sample.id != touch);
                pad.touches.push(TouchSample::pressed(touch, clamped, time_stamp));
            }
            Ok(())
        });
    }

    /// Active touch ids on the pad, oldest first.
    #[must_use]
    pub fn touches(&self, device: DeviceType, touchpad: TouchpadId) -> Vec<TouchId> {
        self.query(device, Vec::new(), |entry| {
            entry.check_touchpad(touchpad)?;
            let current = entry.buffer.current();
            Ok(pad(&current, touchpad)
                .map(|pad| pad.active_touches().collect())
                .unwrap_or_default())
        })
    }

    /// Oldest active touch, or the most recently released one.
    #[must_use]
    pub fn primary_touch(&self, device: DeviceType, touchpad: TouchpadId) -> Option<TouchId> {
        self.query(device, None, |entry| {
            entry.check_touchpad(touchpad)?;
            Ok(pad(&entry.buffer.current(), touchpad).and_then(TouchpadState::primary_touch))
        })
    }

    /// Runs `read` with the current and previous sample of a touch
    /// (the primary touch when `touch` is `None`).
    fn with_touch<R>(
        &self,
        device: DeviceType,
        touchpad: TouchpadId,
        touch: Option<TouchId>,
        fallback: R,
        read: impl FnOnce(&Device, bool, TouchSamples<'_>) -> R,
    ) -> R {
        self.query(device, fallback, |entry| {
            let has_gestures = entry.check_touchpad(touchpad)?;
            let current = entry.buffer.current();
            let previous = entry.buffer.previous();
            let curr_pad = pad(&current, touchpad);
            let prev_pad = pad(&previous, touchpad);
            let id = touch.or_else(|| curr_pad.and_then(TouchpadState::primary_touch));
            let samples = TouchSamples {
                gesture: curr_pad.map(|pad| pad.gesture).unwrap_or_default(),
                current: id.and_then(|id| curr_pad.and_then(|pad| pad.touch(id))),
                previous: id.and_then(|id| prev_pad.and_then(|pad| pad.touch(id))),
                current_time: current.time_stamp,
                previous_time: previous.time_stamp,
            };
            Ok(read(entry, has_gestures, samples))
        })
    }

    /// True while the touch is down.
    #[must_use]
    pub fn is_valid_touch(&self, device: DeviceType, touchpad: TouchpadId, touch: Option<TouchId>) -> bool {
        self.with_touch(device, touchpad, touch, false, |_, _, samples| {
            samples.current.is_some_and(|sample| sample.valid)
        })
    }

    /// State bitmask of the touch, treated as a button.
    #[must_use]
    pub fn touch_state(&self, device: DeviceType, touchpad: TouchpadId, touch: Option<TouchId>) -> ButtonState {
        self.with_touch(device, touchpad, touch, ButtonState::INVALID, |entry, _, samples| {
            derive_button_state(
                samples.current.is_some_and(|sample| sample.valid),
                samples.previous.is_some_and(|sample| sample.valid),
                false,
                PressTiming {
                    long_press: entry.long_press,
                    current: touch_held_for(samples.current, samples.current_time),
                    previous: touch_held_for(samples.previous, samples.previous_time),
                },
            )
        })
    }

    /// Normalized touch position, [`INVALID_TOUCH_LOCATION`] when not down.
    #[must_use]
    pub fn touch_location(&self, device: DeviceType, touchpad: TouchpadId, touch: Option<TouchId>) -> Vec2 {
        self.with_touch(device, touchpad, touch, INVALID_TOUCH_LOCATION, |_, _, samples| {
            samples
                .current
                .filter(|sample| sample.valid)
                .map_or(INVALID_TOUCH_LOCATION, |sample| sample.position)
        })
    }

    /// Movement since the previous frame.
    ///
    /// On pads with native gestures this is the gesture displacement.
    #[must_use]
    pub fn touch_delta(&self, device: DeviceType, touchpad: TouchpadId, touch: Option<TouchId>) -> Vec2 {
        self.with_touch(device, touchpad, touch, Vec2::ZERO, |_, has_gestures, samples| {
            if has_gestures {
                return samples.gesture.displacement;
            }
            match (samples.current, samples.previous) {
                (Some(curr), Some(prev)) if curr.valid && prev.valid => curr.position - prev.position,
                _ => Vec2::ZERO,
            }
        })
    }

    /// Filtered touch velocity.
    ///
    /// On pads with native gestures this is the gesture velocity.
    #[must_use]
    pub fn touch_velocity(&self, device: DeviceType, touchpad: TouchpadId, touch: Option<TouchId>) -> Vec2 {
        self.with_touch(device, touchpad, touch, Vec2::ZERO, |_, has_gestures, samples| {
            if has_gestures {
                samples.gesture.velocity
            } else {
                samples.current.map_or(Vec2::ZERO, |sample| sample.velocity)
            }
        })
    }

    // =========================================================================
    // Gestures
    // =========================================================================

    /// Reports a gesture from the platform recognizer.
    pub fn update_gesture(
        &self,
        device: DeviceType,
        touchpad: TouchpadId,
        gesture_type: GestureType,
        direction: GestureDirection,
        displacement: Vec2,
        velocity: Vec2,
    ) {
        self.update(device, |entry, front| {
            let has_gestures = entry.check_touchpad(touchpad)?;
            entry.require(has_gestures, "touch gestures")?;
            let gesture = &mut front.touchpads[touchpad].gesture;
            let initial_axis = match gesture_type {
                GestureType::ScrollStart => dominant_axis(displacement),
                GestureType::ScrollUpdate => gesture.initial_axis,
                _ => Vec2::ZERO,
            };
            *gesture = TouchGesture {
                gesture_type,
                direction,
                displacement,
                velocity,
                initial_axis,
            };
            Ok(())
        });
    }

    /// Latest gesture kind.
    #[must_use]
    pub fn touch_gesture_type(&self, device: DeviceType, touchpad: TouchpadId) -> GestureType {
        self.gesture(device, touchpad).gesture_type
    }

    /// Fling direction, `None` unless the latest gesture is a fling.
    #[must_use]
    pub fn touch_gesture_direction(&self, device: DeviceType, touchpad: TouchpadId) -> GestureDirection {
        let gesture = self.gesture(device, touchpad);
        if gesture.gesture_type == GestureType::Fling {
            gesture.direction
        } else {
            GestureDirection::None
        }
    }

    /// Dominant axis captured when the current scroll started.
    #[must_use]
    pub fn initial_displacement_axis(&self, device: DeviceType, touchpad: TouchpadId) -> Vec2 {
        self.gesture(device, touchpad).initial_axis
    }

    /// Scroll displacement restricted to the initial axis.
    #[must_use]
    pub fn locked_touch_delta(&self, device: DeviceType, touchpad: TouchpadId) -> Vec2 {
        let gesture = self.gesture(device, touchpad);
        gesture.displacement * gesture.initial_axis
    }

    fn gesture(&self, device: DeviceType, touchpad: TouchpadId) -> TouchGesture {
        self.query(device, TouchGesture::default(), |entry| {
            entry.check_touchpad(touchpad)?;
            Ok(pad(&entry.buffer.current(), touchpad)
                .map(|pad| pad.gesture)
                .unwrap_or_default())
        })
    }

    // =========================================================================
    // Pose
    // =========================================================================

    /// Sets the device position.
    pub fn update_position(&self, device: DeviceType, position: Vec3) {
        self.update(device, |entry, front| {
            entry.require(entry.profile.position_dof.is_available(), "position dof")?;
            front.position = position;
            Ok(())
        });
    }

    /// Sets the device rotation. The quaternion is normalized.
    pub fn update_rotation(&self, device: DeviceType, rotation: Quat) {
        self.update(device, |entry, front| {
            entry.require(entry.profile.rotation_dof.is_available(), "rotation dof")?;
            front.rotation = rotation.normalize();
            Ok(())
        });
    }

    /// Device position of the current frame.
    #[must_use]
    pub fn dof_position(&self, device: DeviceType) -> Vec3 {
        self.query(device, Vec3::ZERO, |entry| {
            entry.require(entry.profile.position_dof.is_available(), "position dof")?;
            Ok(entry.buffer.current().position)
        })
    }

    /// Position change since the previous frame.
    #[must_use]
    pub fn dof_delta(&self, device: DeviceType) -> Vec3 {
        self.query(device, Vec3::ZERO, |entry| {
            entry.require(entry.profile.position_dof.is_available(), "position dof")?;
            Ok(entry.buffer.current().position - entry.buffer.previous().position)
        })
    }

    /// Device rotation of the current frame.
    #[must_use]
    pub fn dof_rotation(&self, device: DeviceType) -> Quat {
        self.query(device, Quat::IDENTITY, |entry| {
            entry.require(entry.profile.rotation_dof.is_available(), "rotation dof")?;
            Ok(entry.buffer.current().rotation)
        })
    }

    /// Rotation from the previous frame's orientation to the current one.
    #[must_use]
    pub fn dof_angular_delta(&self, device: DeviceType) -> Quat {
        self.query(device, Quat::IDENTITY, |entry| {
            entry.require(entry.profile.rotation_dof.is_available(), "rotation dof")?;
            Ok(entry.buffer.previous().rotation.inverse() * entry.buffer.current().rotation)
        })
    }

    /// Device pose as a matrix. Missing degrees of freedom are identity.
    #[must_use]
    pub fn dof_world_from_object(&self, device: DeviceType) -> Mat4 {
        self.query(device, Mat4::IDENTITY, |entry| {
            let profile = &entry.profile;
            entry.require(
                profile.position_dof.is_available() || profile.rotation_dof.is_available(),
                "dof",
            )?;
            let current = entry.buffer.current();
            let rotation = if profile.rotation_dof.is_available() {
                current.rotation
            } else {
                Quat::IDENTITY
            };
            let position = if profile.position_dof.is_available() {
                current.position
            } else {
                Vec3::ZERO
            };
            Ok(Mat4::from_rotation_translation(rotation, position))
        })
    }

    // =========================================================================
    // Scroll
    // =========================================================================

    /// Adds to a wheel's delta for this frame.
    pub fn update_scroll(&self, device: DeviceType, wheel: usize, delta: i32) {
        self.update(device, |entry, front| {
            entry.require(wheel < entry.profile.scroll_wheels, "such scroll wheel")?;
            front.scroll[wheel] = front.scroll[wheel].saturating_add(delta);
            Ok(())
        });
    }

    /// Wheel delta of the current frame.
    #[must_use]
    pub fn scroll_delta(&self, device: DeviceType, wheel: usize) -> i32 {
        self.query(device, 0, |entry| {
            entry.require(wheel < entry.profile.scroll_wheels, "such scroll wheel")?;
            Ok(entry.buffer.current().scroll[wheel])
        })
    }

    // =========================================================================
    // Eyes
    // =========================================================================

    /// Sets the rendering parameters of one eye.
    pub fn update_eye(&self, device: DeviceType, eye: EyeId, eye_from_head: Mat4, fov: Vec4, viewport: IVec4) {
        self.update(device, |entry, front| {
            entry.check_eye(eye)?;
            let state = &mut front.eyes[eye];
            state.eye_from_head = eye_from_head;
            state.fov = fov;
            state.viewport = viewport;
            Ok(())
        });
    }

    /// Head to eye transform.
    #[must_use]
    pub fn eye_from_head(&self, device: DeviceType, eye: EyeId) -> Mat4 {
        self.query(device, Mat4::IDENTITY, |entry| {
            entry.check_eye(eye)?;
            Ok(entry.buffer.current().eyes[eye].eye_from_head)
        })
    }

    /// Eye field of view as `(left, right, bottom, top)`.
    #[must_use]
    pub fn eye_fov(&self, device: DeviceType, eye: EyeId) -> Vec4 {
        self.query(device, Vec4::ZERO, |entry| {
            entry.check_eye(eye)?;
            Ok(entry.buffer.current().eyes[eye].fov)
        })
    }

    /// Eye viewport as `(x, y, width, height)`.
    #[must_use]
    pub fn eye_viewport(&self, device: DeviceType, eye: EyeId) -> IVec4 {
        self.query(device, IVec4::ZERO, |entry| {
            entry.check_eye(eye)?;
            Ok(entry.buffer.current().eyes[eye].viewport)
        })
    }

    // =========================================================================
    // Battery
    // =========================================================================

    /// Sets the battery report. Charge is clamped to 100.
    pub fn update_battery(&self, device: DeviceType, state: BatteryState, charge: Option<u8>) {
        self.update(device, |entry, front| {
            entry.require(entry.profile.has_battery, "battery")?;
            if charge.is_some_and(|charge| charge > 100) {
                tracing::error!(device = ?device, ?charge, "battery charge out of range, clamped");
            }
            front.battery = Some(BatteryStatus {
                state,
                charge: charge.map(|charge| charge.min(100)),
            });
            Ok(())
        });
    }

    /// Battery state of the current frame.
    #[must_use]
    pub fn battery_state(&self, device: DeviceType) -> BatteryState {
        self.query(device, BatteryState::Unknown, |entry| {
            entry.require(entry.profile.has_battery, "battery")?;
            Ok(entry.buffer.current().battery.map(|battery| battery.state).unwrap_or_default())
        })
    }

    /// Battery charge in percent.
    #[must_use]
    pub fn battery_charge(&self, device: DeviceType) -> Option<u8> {
        self.query(device, None, |entry| {
            entry.require(entry.profile.has_battery, "battery")?;
            Ok(entry.buffer.current().battery.and_then(|battery| battery.charge))
        })
    }
}

/// Current and previous sample of one touch.
struct TouchSamples<'a> {
    gesture: TouchGesture,
    current: Option<&'a TouchSample>,
    previous: Option<&'a TouchSample>,
    current_time: Duration,
    previous_time: Duration,
}
