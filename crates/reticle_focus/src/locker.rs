//! # Focus Locking
//!
//! A lock pins a device's focus to an entity, with the cursor at a fixed point
//! in that entity's local space. While a lock is held, collision is skipped
//! for the device.

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec3;
use parking_lot::Mutex;
use reticle_core::{EntityId, TransformProvider};
use reticle_input::DeviceType;

use crate::focus::InputFocus;

/// An active lock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FocusLock {
    /// Locked entity.
    pub entity: EntityId,
    /// Cursor offset in the entity's local space.
    pub offset: Vec3,
}

/// Per-device lock table.
pub struct InputFocusLocker {
    transforms: Option<Arc<dyn TransformProvider>>,
    locks: Mutex<HashMap<DeviceType, FocusLock>>,
}

impl InputFocusLocker {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new(transforms: Option<Arc<dyn TransformProvider>>) -> Self {
        Self {
            transforms,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Locks `device` onto `entity`. A null entity clears the lock.
    pub fn lock_on(&self, device: DeviceType, entity: EntityId, offset: Vec3) {
        if entity.is_null() {
            self.unlock(device);
            return;
        }
        tracing::debug!(device = ?device, entity = ?entity, "focus locked");
        self.locks.lock().insert(device, FocusLock { entity, offset });
    }

    /// Locked entity for `device`, null if unlocked.
    #[must_use]
    pub fn current_lock(&self, device: DeviceType) -> EntityId {
        self.locks
            .lock()
            .get(&device)
            .map_or(EntityId::NULL, |lock| lock.entity)
    }

    /// Full lock record for `device`.
    #[must_use]
    pub fn lock(&self, device: DeviceType) -> Option<FocusLock> {
        self.locks.lock().get(&device).copied()
    }

    /// Clears the lock for `device`.
    pub fn unlock(&self, device: DeviceType) {
        if self.locks.lock().remove(&device).is_some() {
            tracing::debug!(device = ?device, "focus unlocked");
        }
    }

    /// Applies the lock for `focus.device`, if any.
    ///
    /// Returns `true` when a lock was applied and collision must be skipped.
    /// The table is only read.
    pub fn update_input_focus(&self, focus: &mut InputFocus) -> bool {
        let Some(lock) = self.lock(focus.device) else {
            return false;
        };

        focus.target = lock.entity;
        match self
            .transforms
            .as_ref()
            .and_then(|transforms| transforms.world_matrix(lock.entity))
        {
            Some(world) => focus.cursor_position = world.transform_point3(lock.offset),
            None => {
                tracing::warn!(device = ?focus.device, entity = ?lock.entity, "locked entity has no transform");
            }
        }
        true
    }
}
