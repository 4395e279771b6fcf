//! # Cursor Collaborator
//!
//! The pipeline asks the cursor owner where a no-hit cursor sits and which
//! entity the device ray hangs under, and hands it each finalized focus.
//! Grab handlers hide and restore the cursor and laser through the same trait.

use std::collections::HashMap;
use std::time::Duration;

use glam::Vec3;
use parking_lot::Mutex;
use reticle_core::EntityId;
use reticle_input::DeviceType;

use crate::focus::InputFocus;

/// Cursor rendering collaborator.
pub trait CursorProvider: Send + Sync {
    /// Entity whose world transform applies to the device ray, null for none.
    fn cursor_parent(&self, device: DeviceType) -> EntityId;

    /// Cursor distance along the ray when nothing is hit.
    fn no_hit_distance(&self, device: DeviceType) -> f32;

    /// Called once per frame, with no focus when no device is connected.
    fn advance_frame(&self, delta_time: Duration, focus: Option<&InputFocus>);

    /// Cursor visibility.
    fn is_cursor_visible(&self, device: DeviceType) -> bool;

    /// Shows or hides the cursor.
    fn set_cursor_visible(&self, device: DeviceType, visible: bool);

    /// Laser visibility.
    fn is_laser_visible(&self, device: DeviceType) -> bool;

    /// Shows or hides the laser.
    fn set_laser_visible(&self, device: DeviceType, visible: bool);
}

#[derive(Clone, Copy, Debug)]
struct CursorRecord {
    parent: EntityId,
    no_hit_distance: Option<f32>,
    cursor_visible: bool,
    laser_visible: bool,
    position: Vec3,
    target: EntityId,
}

impl Default for CursorRecord {
    fn default() -> Self {
        Self {
            parent: EntityId::NULL,
            no_hit_distance: None,
            cursor_visible: true,
            laser_visible: true,
            position: Vec3::ZERO,
            target: EntityId::NULL,
        }
    }
}

/// Headless cursor: remembers where the cursor is and what it is over.
pub struct SimpleCursor {
    default_no_hit_distance: f32,
    records: Mutex<HashMap<DeviceType, CursorRecord>>,
    active: Mutex<Option<DeviceType>>,
}

impl SimpleCursor {
    /// Creates a cursor with the given default no-hit distance.
    #[must_use]
    pub fn new(default_no_hit_distance: f32) -> Self {
        Self {
            default_no_hit_distance,
            records: Mutex::new(HashMap::new()),
            active: Mutex::new(None),
        }
    }

    fn with_record<R>(&self, device: DeviceType, f: impl FnOnce(&mut CursorRecord) -> R) -> R {
        f(self.records.lock().entry(device).or_default())
    }

    /// Hangs the device ray under `parent`.
    pub fn set_parent(&self, device: DeviceType, parent: EntityId) {
        self.with_record(device, |record| record.parent = parent);
    }

    /// Overrides the no-hit distance for one device.
    pub fn set_no_hit_distance(&self, device: DeviceType, distance: f32) {
        self.with_record(device, |record| record.no_hit_distance = Some(distance));
    }

    /// Last cursor position of `device`.
    #[must_use]
    pub fn position(&self, device: DeviceType) -> Vec3 {
        self.with_record(device, |record| record.position)
    }

    /// Entity the cursor of `device` was last over.
    #[must_use]
    pub fn target(&self, device: DeviceType) -> EntityId {
        self.with_record(device, |record| record.target)
    }

    /// Device of the last focus, `None` once no device is connected.
    #[must_use]
    pub fn active_device(&self) -> Option<DeviceType> {
        *self.active.lock()
    }
}

impl Default for SimpleCursor {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl CursorProvider for SimpleCursor {
    fn cursor_parent(&self, device: DeviceType) -> EntityId {
        self.with_record(device, |record| record.parent)
    }

    fn no_hit_distance(&self, device: DeviceType) -> f32 {
        let default = self.default_no_hit_distance;
        self.with_record(device, |record| record.no_hit_distance.unwrap_or(default))
    }

    fn advance_frame(&self, _delta_time: Duration, focus: Option<&InputFocus>) {
        *self.active.lock() = focus.map(|focus| focus.device);
        if let Some(focus) = focus {
            self.with_record(focus.device, |record| {
                record.position = focus.cursor_position;
                record.target = focus.target;
            });
        }
    }

    fn is_cursor_visible(&self, device: DeviceType) -> bool {
        self.with_record(device, |record| record.cursor_visible)
    }

    fn set_cursor_visible(&self, device: DeviceType, visible: bool) {
        self.with_record(device, |record| record.cursor_visible = visible);
    }

    fn is_laser_visible(&self, device: DeviceType) -> bool {
        self.with_record(device, |record| record.laser_visible)
    }

    fn set_laser_visible(&self, device: DeviceType, visible: bool) {
        self.with_record(device, |record| record.laser_visible = visible);
    }
}
