//! # Grab Handler Plumbing
//!
//! The contract every grab variant implements, plus what they share:
//! collaborators, per-entity def and active-grab tables, and cursor/laser
//! visibility capture.
//!
//! ```text
//! GrabSystem                          handler (linear / spherical / planar)
//! ──────────                          ─────────────────────────────────────
//! grab(entity, device) ─────────────► start_grab   capture, lock focus
//! advance_frame ──┬─────────────────► update_grab  pose from device ray
//!                 └─────────────────► should_cancel
//! release / cancel ─────────────────► end_grab     unlock, restore visibility
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use glam::{Mat4, Vec3};
use parking_lot::{Mutex, RwLock};
use reticle_core::{EntityId, TransformProvider};
use reticle_focus::{CursorProvider, InputFocus, InputFocusLocker, InputProcessor};
use reticle_input::{DeviceType, InputManager};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{GrabError, GrabResult};

/// Implemented by each grab variant and driven by the grab coordinator.
pub trait GrabInputInterface: Send + Sync {
    /// Begins holding `entity` with `device`. `false` cancels the grab.
    fn start_grab(&self, entity: EntityId, device: DeviceType) -> bool;

    /// Constrained world matrix for this frame. Returns `original` when the
    /// device ray misses the constraint.
    fn update_grab(&self, entity: EntityId, device: DeviceType, original: &Mat4) -> Mat4;

    /// Whether the grab must be canceled after this frame's update.
    fn should_cancel(&self, entity: EntityId, device: DeviceType) -> bool;

    /// Stops holding `entity`.
    fn end_grab(&self, entity: EntityId, device: DeviceType);
}

/// Frame a constraint direction is expressed in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefSpace {
    /// Follows the entity's rotation.
    Local,
    /// Fixed in the world.
    #[default]
    World,
}

impl DefSpace {
    /// `direction` in world space, normalized. `None` when it collapses.
    #[must_use]
    pub fn world_direction(self, world_from_entity: &Mat4, direction: Vec3) -> Option<Vec3> {
        let direction = match self {
            Self::Local => world_from_entity.transform_vector3(direction),
            Self::World => direction,
        };
        direction.try_normalize()
    }
}

/// Parses a grab def from TOML.
///
/// # Errors
///
/// [`GrabError::InvalidDef`] when the document does not match the def.
pub fn parse_def<D: DeserializeOwned>(source: &str) -> GrabResult<D> {
    toml::from_str(source).map_err(|e| GrabError::InvalidDef(e.to_string()))
}

// =============================================================================
// COLLABORATORS
// =============================================================================

/// Collaborators shared by every grab handler.
#[derive(Clone)]
pub struct GrabContext {
    /// Device poses (HMD position for spherical grabs).
    pub input: Arc<InputManager>,
    /// Source of each device's latest focus.
    pub processor: Arc<InputProcessor>,
    /// Focus locks taken for the duration of a grab.
    pub locker: Arc<InputFocusLocker>,
    /// Entity transforms.
    pub transforms: Arc<dyn TransformProvider>,
    /// Cursor and laser visibility, optional.
    pub cursor: Option<Arc<dyn CursorProvider>>,
}

impl GrabContext {
    /// Latest focus of `device`.
    pub(crate) fn focus(&self, device: DeviceType) -> GrabResult<InputFocus> {
        self.processor
            .input_focus(device)
            .ok_or(GrabError::MissingFocus(device))
    }

    /// World matrix of `entity`.
    pub(crate) fn world_matrix(&self, entity: EntityId) -> GrabResult<Mat4> {
        self.transforms
            .world_matrix(entity)
            .ok_or(GrabError::MissingTransform(entity))
    }

    /// Hides the cursor and/or laser, returning what to restore.
    pub(crate) fn hide(&self, device: DeviceType, cursor: bool, laser: bool) -> Visibility {
        let Some(provider) = self.cursor.as_ref() else {
            return Visibility::default();
        };
        let mut saved = Visibility::default();
        if cursor {
            saved.cursor = Some(provider.is_cursor_visible(device));
            provider.set_cursor_visible(device, false);
        }
        if laser {
            saved.laser = Some(provider.is_laser_visible(device));
            provider.set_laser_visible(device, false);
        }
        saved
    }

    /// Puts back what [`GrabContext::hide`] changed.
    pub(crate) fn restore(&self, device: DeviceType, saved: Visibility) {
        let Some(provider) = self.cursor.as_ref() else {
            return;
        };
        if let Some(visible) = saved.cursor {
            provider.set_cursor_visible(device, visible);
        }
        if let Some(visible) = saved.laser {
            provider.set_laser_visible(device, visible);
        }
    }
}

/// Cursor and laser visibility before a grab hid them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Visibility {
    cursor: Option<bool>,
    laser: Option<bool>,
}

// =============================================================================
// PER-ENTITY TABLES
// =============================================================================

/// State of one grab in progress.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ActiveGrab<S> {
    pub device: DeviceType,
    pub visibility: Visibility,
    pub state: S,
}

/// Defs by entity plus the grabs currently held.
pub(crate) struct HandlerTable<D, S> {
    defs: RwLock<HashMap<EntityId, D>>,
    active: Mutex<HashMap<EntityId, ActiveGrab<S>>>,
}

impl<D: Clone, S: Clone> HandlerTable<D, S> {
    pub fn new() -> Self {
        Self {
            defs: RwLock::new(HashMap::new()),
            active: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert_def(&self, entity: EntityId, def: D) {
        self.defs.write().insert(entity, def);
    }

    pub fn remove_def(&self, entity: EntityId) {
        self.defs.write().remove(&entity);
    }

    pub fn def(&self, entity: EntityId) -> GrabResult<D> {
        self.defs
            .read()
            .get(&entity)
            .cloned()
            .ok_or(GrabError::NoGrabDef(entity))
    }

    pub fn has_def(&self, entity: EntityId) -> bool {
        self.defs.read().contains_key(&entity)
    }

    pub fn begin(&self, entity: EntityId, grab: ActiveGrab<S>) {
        self.active.lock().insert(entity, grab);
    }

    pub fn active(&self, entity: EntityId) -> Option<ActiveGrab<S>> {
        self.active.lock().get(&entity).cloned()
    }

    pub fn end(&self, entity: EntityId) -> Option<ActiveGrab<S>> {
        self.active.lock().remove(&entity)
    }

    pub fn is_active(&self, entity: EntityId) -> bool {
        self.active.lock().contains_key(&entity)
    }
}

/// Cancel rule shared by every variant: the def is gone or the entity was
/// disabled.
pub(crate) fn lost_entity<D: Clone, S: Clone>(
    table: &HandlerTable<D, S>,
    ctx: &GrabContext,
    entity: EntityId,
) -> bool {
    !table.has_def(entity) || !ctx.transforms.is_enabled(entity)
}

/// End rule shared by every variant: unlock focus, restore visibility.
///
/// Both apply to the device that started the grab, whatever `device` the
/// caller passes.
pub(crate) fn finish<D: Clone, S: Clone>(
    table: &HandlerTable<D, S>,
    ctx: &GrabContext,
    entity: EntityId,
    device: DeviceType,
) {
    match table.end(entity) {
        Some(grab) => {
            if grab.device != device {
                tracing::warn!(entity = ?entity, held_by = ?grab.device, device = ?device, "end_grab from another device");
            }
            ctx.locker.unlock(grab.device);
            ctx.restore(grab.device, grab.visibility);
        }
        // A refused start ends without ever beginning.
        None => tracing::debug!(entity = ?entity, device = ?device, "end_grab without an active grab"),
    }
}

/// Logs a failed start and maps it to the interface's `bool`.
pub(crate) fn started(entity: EntityId, device: DeviceType, result: GrabResult<()>) -> bool {
    match result {
        Ok(()) => {
            tracing::debug!(entity = ?entity, device = ?device, "grab started");
            true
        }
        Err(error) => {
            tracing::warn!(entity = ?entity, device = ?device, %error, "grab refused");
            false
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use reticle_core::{Ray, Scene};
    use reticle_focus::{FocusConfig, SimpleCursor};
    use reticle_input::DeviceProfile;
    use std::time::Duration;

    pub const DEVICE: DeviceType = DeviceType::Controller;

    pub struct Rig {
        pub scene: Arc<Scene>,
        pub cursor: Arc<SimpleCursor>,
        pub ctx: GrabContext,
    }

    impl Rig {
        pub fn new() -> Self {
            let input = Arc::new(InputManager::new());
            input.connect_device(DEVICE, DeviceProfile::controller_6dof());
            let scene = Arc::new(Scene::new());
            let transforms = Arc::clone(&scene) as Arc<dyn TransformProvider>;
            let processor = Arc::new(InputProcessor::new(
                Arc::clone(&input),
                Some(Arc::clone(&transforms)),
                None,
                &FocusConfig::default(),
            ));
            let cursor = Arc::new(SimpleCursor::default());
            let ctx = GrabContext {
                input,
                processor,
                locker: Arc::new(InputFocusLocker::new(Some(Arc::clone(&transforms)))),
                transforms,
                cursor: Some(Arc::clone(&cursor) as Arc<dyn CursorProvider>),
            };
            Self { scene, cursor, ctx }
        }

        pub fn entity_at(&self, position: Vec3) -> EntityId {
            let entity = self.scene.spawn();
            self.scene
                .set_local_matrix(entity, Mat4::from_translation(position))
                .unwrap();
            entity
        }

        /// Feeds a focus along `ray` with the cursor `distance` along it.
        pub fn aim(&self, ray: Ray, distance: f32, target: EntityId) {
            let ray = Ray::new(ray.origin, ray.direction.normalize_or_zero());
            let mut focus = InputFocus::new(DEVICE);
            focus.origin = ray.origin;
            focus.collision_ray = ray;
            focus.cursor_position = ray.point_at(distance);
            focus.no_hit_cursor_position = focus.cursor_position;
            focus.target = target;
            self.ctx.processor.update_device(Duration::from_millis(16), focus);
        }

        pub fn world(&self, entity: EntityId) -> Mat4 {
            self.scene.world_matrix(entity).unwrap()
        }

        /// One coordinator-style frame: update, then write back.
        pub fn step(&self, handler: &dyn GrabInputInterface, entity: EntityId) -> Mat4 {
            let updated = handler.update_grab(entity, DEVICE, &self.world(entity));
            self.scene.set_world_matrix(entity, &updated);
            updated
        }
    }

    #[test]
    fn test_visibility_round_trip() {
        let rig = Rig::new();
        rig.cursor.set_laser_visible(DEVICE, false);

        let saved = rig.ctx.hide(DEVICE, true, true);
        assert!(!rig.cursor.is_cursor_visible(DEVICE));
        assert!(!rig.cursor.is_laser_visible(DEVICE));

        rig.ctx.restore(DEVICE, saved);
        assert!(rig.cursor.is_cursor_visible(DEVICE));
        assert!(!rig.cursor.is_laser_visible(DEVICE));
    }

    #[test]
    fn test_local_space_follows_rotation() {
        let rotated = Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let local = DefSpace::Local.world_direction(&rotated, Vec3::X).unwrap();
        assert!((local - Vec3::Y).length() < 1e-5);
        assert_eq!(DefSpace::World.world_direction(&rotated, Vec3::X), Some(Vec3::X));
        assert_eq!(DefSpace::World.world_direction(&rotated, Vec3::ZERO), None);
    }
}
