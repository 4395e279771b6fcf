//! # Device State Buffer
//!
//! A [`TripleBuffer`] of [`DeviceState`] plus the per-frame bookkeeping that
//! runs while the front slot is published:
//!
//! ```text
//! advance(dt)
//!   ├─ time_stamp += dt
//!   ├─ touch velocity: RC low-pass of (position - last position) / dt
//!   ├─ released touch: keep last velocity for one frame
//!   ├─ drop touches released on both this and the last frame
//!   ├─ pads without gestures: derive fling from released touches
//!   └─ new front: copy of the published slot, per-frame deltas cleared
//! ```

use std::time::Duration;

use glam::Vec2;
use reticle_core::{SlotReadHandle, SlotWriteHandle, TripleBuffer};

use crate::config::InputConfig;
use crate::device::{DeviceProfile, GestureDirection, GestureType};
use crate::state::{DeviceState, TouchGesture, TouchpadState};

/// Frame bookkeeping parameters, resolved from the configuration once.
#[derive(Clone, Copy, Debug, PartialEq)]
struct AdvanceParams {
    touch_velocity_rc: f32,
    min_fling_velocity: f32,
}

/// Triple-buffered state of one device.
///
/// - [`write`](Self::write) is the only mutable slot ("front")
/// - [`current`](Self::current) and [`previous`](Self::previous) are read-only
/// - [`advance`](Self::advance) rotates them; it must not race with either
pub struct DeviceStateBuffer {
    buffer: TripleBuffer<DeviceState>,
    /// Per pad: the platform reports gestures itself.
    native_gestures: Vec<bool>,
    params: AdvanceParams,
}

impl DeviceStateBuffer {
    /// Allocates a buffer seeded with the profile's reference state.
    #[must_use]
    pub fn new(profile: &DeviceProfile, config: &InputConfig) -> Self {
        Self {
            buffer: TripleBuffer::new(DeviceState::from_profile(profile)),
            native_gestures: profile.touchpads.iter().map(|pad| pad.has_gestures).collect(),
            params: AdvanceParams {
                touch_velocity_rc: config.touch_velocity_rc(),
                min_fling_velocity: config.min_fling_velocity,
            },
        }
    }

    /// The writable front slot.
    #[must_use]
    pub fn write(&self) -> SlotWriteHandle<'_, DeviceState> {
        self.buffer.write()
    }

    /// The latest published frame.
    #[must_use]
    pub fn current(&self) -> SlotReadHandle<'_, DeviceState> {
        self.buffer.current()
    }

    /// The frame before `current`.
    #[must_use]
    pub fn previous(&self) -> SlotReadHandle<'_, DeviceState> {
        self.buffer.previous()
    }

    /// Number of advanced frames.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.buffer.frame_count()
    }

    /// Publishes the front slot and seeds a new one.
    pub fn advance(&self, delta_time: Duration) {
        let params = self.params;
        let native_gestures = &self.native_gestures;

        self.buffer.advance_with(
            |front, current| {
                front.time_stamp += delta_time;
                let dt = delta_time.as_secs_f32();

                for (index, pad) in front.touchpads.iter_mut().enumerate() {
                    let Some(last) = current.touchpads.get(index) else {
                        continue;
                    };
                    finalize_touches(pad, last, dt, params.touch_velocity_rc);
                    if !native_gestures.get(index).copied().unwrap_or(false) {
                        derive_fling(pad, last, params.min_fling_velocity);
                    }
                }
            },
            DeviceState::clear_frame_deltas,
        );
    }
}

fn finalize_touches(pad: &mut TouchpadState, last: &TouchpadState, dt: f32, rc: f32) {
    for touch in &mut pad.touches {
        let previous = last.touch(touch.id).filter(|previous| previous.valid);
        touch.velocity = match (touch.valid, previous) {
            (true, Some(previous)) if dt > 0.0 => {
                let instantaneous = (touch.position - previous.position) / dt;
                previous.velocity.lerp(instantaneous, dt / (rc + dt))
            }
            (true, Some(previous)) => previous.velocity,
            (true, None) => Vec2::ZERO,
            // Just released: keep the velocity one more frame so flings can read it.
            (false, Some(previous)) => previous.velocity,
            (false, None) => Vec2::ZERO,
        };
    }

    pad.touches.retain(|touch| {
        touch.valid || last.touch(touch.id).is_some_and(|previous| previous.valid)
    });
}

fn derive_fling(pad: &mut TouchpadState, last: &TouchpadState, min_velocity: f32) {
    let fling = pad
        .touches
        .iter()
        .filter(|touch| !touch.valid)
        .filter(|touch| last.touch(touch.id).is_some_and(|previous| previous.valid))
        .find(|touch| touch.velocity.length() >= min_velocity && touch.velocity != Vec2::ZERO)
        .map(|touch| touch.velocity);

    pad.gesture = match fling {
        Some(velocity) => {
            let direction = if velocity.x.abs() > velocity.y.abs() {
                if velocity.x < 0.0 {
                    GestureDirection::Left
                } else {
                    GestureDirection::Right
                }
            } else if velocity.y < 0.0 {
                GestureDirection::Up
            } else {
                GestureDirection::Down
            };
            TouchGesture {
                gesture_type: GestureType::Fling,
                direction,
                velocity,
                ..Default::default()
            }
        }
        None => TouchGesture::default(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{TouchSample, INVALID_TOUCH_LOCATION};

    const FRAME: Duration = Duration::from_millis(100);

    fn buffer() -> DeviceStateBuffer {
        DeviceStateBuffer::new(&DeviceProfile::controller_3dof(), &InputConfig::default())
    }

    fn press(buffer: &DeviceStateBuffer, id: u32, position: Vec2) {
        let mut front = buffer.write();
        let time = front.time_stamp;
        match front.touchpads[0].touch_mut(id) {
            Some(touch) => touch.position = position,
            None => front.touchpads[0]
                .touches
                .push(TouchSample::pressed(id, position, time)),
        }
    }

    fn release(buffer: &DeviceStateBuffer, id: u32) {
        let mut front = buffer.write();
        if let Some(touch) = front.touchpads[0].touch_mut(id) {
            touch.valid = false;
            touch.position = INVALID_TOUCH_LOCATION;
        }
    }

    #[test]
    fn test_time_stamp_accumulates() {
        let buffer = buffer();
        buffer.advance(FRAME);
        buffer.advance(FRAME);
        assert_eq!(buffer.current().time_stamp, FRAME * 2);
        assert_eq!(buffer.previous().time_stamp, FRAME);
        assert_eq!(buffer.frame_count(), 2);
    }

    #[test]
    fn test_touch_velocity_is_filtered() {
        let buffer = buffer();
        press(&buffer, 0, Vec2::new(0.1, 0.5));
        buffer.advance(FRAME);
        assert_eq!(buffer.current().touchpads[0].touches[0].velocity, Vec2::ZERO);

        press(&buffer, 0, Vec2::new(0.2, 0.5));
        buffer.advance(FRAME);
        let velocity = buffer.current().touchpads[0].touches[0].velocity;
        // Instantaneous speed is 1.0; the filter passes dt / (rc + dt) of it.
        let rc = InputConfig::default().touch_velocity_rc();
        let expected = 0.1 / (rc + 0.1);
        assert!((velocity.x - expected).abs() < 1e-4);
        assert!(velocity.y.abs() < 1e-6);
    }

    #[test]
    fn test_released_touch_is_collected_after_one_frame() {
        let buffer = buffer();
        press(&buffer, 7, Vec2::splat(0.5));
        buffer.advance(FRAME);
        release(&buffer, 7);
        buffer.advance(FRAME);

        let touches = buffer.current().touchpads[0].touches.clone();
        assert_eq!(touches.len(), 1);
        assert!(!touches[0].valid);

        buffer.advance(FRAME);
        assert!(buffer.current().touchpads[0].touches.is_empty());
        assert_eq!(buffer.previous().touchpads[0].touches.len(), 1);
    }

    #[test]
    fn test_fling_from_released_touch() {
        let buffer = buffer();
        press(&buffer, 1, Vec2::new(0.5, 0.9));
        buffer.advance(FRAME);
        press(&buffer, 1, Vec2::new(0.5, 0.3));
        buffer.advance(FRAME);
        release(&buffer, 1);
        buffer.advance(FRAME);

        let gesture = buffer.current().touchpads[0].gesture;
        assert_eq!(gesture.gesture_type, GestureType::Fling);
        assert_eq!(gesture.direction, GestureDirection::Up);

        buffer.advance(FRAME);
        assert_eq!(
            buffer.current().touchpads[0].gesture.direction,
            GestureDirection::None
        );
    }

    #[test]
    fn test_slow_release_is_not_a_fling() {
        let buffer = buffer();
        press(&buffer, 1, Vec2::new(0.5, 0.5));
        buffer.advance(FRAME);
        press(&buffer, 1, Vec2::new(0.51, 0.5));
        buffer.advance(FRAME);
        release(&buffer, 1);
        buffer.advance(FRAME);
        assert_eq!(
            buffer.current().touchpads[0].gesture.gesture_type,
            GestureType::None
        );
    }

    #[test]
    fn test_scroll_resets_on_new_front() {
        let buffer =
            DeviceStateBuffer::new(&DeviceProfile::mouse(), &InputConfig::default());
        buffer.write().scroll[0] = 3;
        buffer.advance(FRAME);
        assert_eq!(buffer.current().scroll[0], 3);
        assert_eq!(buffer.write().scroll[0], 0);
        buffer.advance(FRAME);
        assert_eq!(buffer.current().scroll[0], 0);
    }
}
