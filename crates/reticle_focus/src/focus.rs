//! # Input Focus
//!
//! One [`InputFocus`] is computed per device per frame. Only the processor
//! keeps it past the frame (as "current" and then "previous").

use glam::Vec3;
use reticle_core::{EntityId, Ray};
use reticle_input::DeviceType;

/// What a device is pointing at this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputFocus {
    /// Device the focus was computed for.
    pub device: DeviceType,
    /// Origin of the device ray before any HMD substitution.
    pub origin: Vec3,
    /// Ray used for collision.
    pub collision_ray: Ray,
    /// Hit point, or the no-hit point when nothing was hit.
    pub cursor_position: Vec3,
    /// Cursor position before collision ran.
    pub no_hit_cursor_position: Vec3,
    /// Resolved target, null when nothing is focused.
    pub target: EntityId,
    /// Entity the held button was pressed on. Filled by the processor.
    pub pressed_entity: EntityId,
    /// Whether the target accepts interaction.
    pub interactive: bool,
    /// Whether the target may be dragged.
    pub draggable: bool,
}

impl InputFocus {
    /// Empty focus for `device`.
    #[must_use]
    pub fn new(device: DeviceType) -> Self {
        Self {
            device,
            origin: Vec3::ZERO,
            collision_ray: Ray::ZERO,
            cursor_position: Vec3::ZERO,
            no_hit_cursor_position: Vec3::ZERO,
            target: EntityId::NULL,
            pressed_entity: EntityId::NULL,
            interactive: false,
            draggable: false,
        }
    }

    /// Target if it accepts interaction, null otherwise.
    #[inline]
    #[must_use]
    pub fn interactive_target(&self) -> EntityId {
        if self.interactive {
            self.target
        } else {
            EntityId::NULL
        }
    }
}
