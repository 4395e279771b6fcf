//! # Spherical Grab
//!
//! Keeps the entity on a sphere shell around a center point. The radius is
//! the entity's distance from the center when the grab starts.
//!
//! ```text
//!              hit
//!     ray ─────●────▶          plain:       entity = hit
//!             /                keep offset: entity = center + R · (hit − center)
//!      center ●                              R = rotation taking the first hit
//!             \                                  onto the entity at grab start
//!              ● entity
//! ```

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use reticle_core::{ray_sphere_near_distance, EntityId, Ray, Sphere};
use reticle_input::DeviceType;
use serde::{Deserialize, Serialize};

use crate::error::{GrabError, GrabResult};
use crate::handler::{self, ActiveGrab, GrabContext, GrabInputInterface, HandlerTable};
use crate::system::GrabSystem;

const MIN_RADIUS: f32 = 1.0e-4;

/// Per-entity spherical grab setup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SphericalGrabDef {
    /// Sphere center in world space. Ignored while `follow_hmd` finds an HMD.
    pub center: Vec3,
    /// Hold the entity at its rotational offset from the pointed-at spot
    /// instead of snapping it under the ray.
    pub keep_offset: bool,
    /// Re-center on the HMD position every frame.
    pub follow_hmd: bool,
    /// Hide the cursor while held.
    pub hide_cursor: bool,
    /// Hide the laser while held.
    pub hide_laser: bool,
}

#[derive(Clone, Copy, Debug)]
struct SphericalState {
    radius: f32,
    offset: Quat,
}

/// Grab handler constraining entities to a sphere shell.
pub struct SphericalGrabHandler {
    ctx: GrabContext,
    table: HandlerTable<SphericalGrabDef, SphericalState>,
}

impl SphericalGrabHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(ctx: GrabContext) -> Arc<Self> {
        Arc::new(Self {
            ctx,
            table: HandlerTable::new(),
        })
    }

    /// Makes `entity` spherically grabbable and attaches this handler to it.
    pub fn create(self: &Arc<Self>, grabs: &GrabSystem, entity: EntityId, def: SphericalGrabDef) {
        self.table.insert_def(entity, def);
        grabs.set_input_handler(entity, Arc::clone(self) as Arc<dyn GrabInputInterface>);
    }

    /// Detaches from `entity`, canceling a grab in progress.
    pub fn destroy(self: &Arc<Self>, grabs: &GrabSystem, entity: EntityId) {
        grabs.remove_input_handler(entity, &(Arc::clone(self) as Arc<dyn GrabInputInterface>));
        self.table.remove_def(entity);
    }

    /// Whether `entity` is held through this handler.
    #[must_use]
    pub fn is_grabbing(&self, entity: EntityId) -> bool {
        self.table.is_active(entity)
    }

    /// Sphere a held entity is constrained to this frame.
    #[must_use]
    pub fn grab_sphere(&self, entity: EntityId) -> Option<Sphere> {
        let grab = self.table.active(entity)?;
        let def = self.table.def(entity).ok()?;
        Some(Sphere::new(self.center(&def), grab.state.radius))
    }

    fn center(&self, def: &SphericalGrabDef) -> Vec3 {
        if def.follow_hmd && self.ctx.input.has_position_dof(DeviceType::Hmd) {
            self.ctx.input.dof_position(DeviceType::Hmd)
        } else {
            def.center
        }
    }

    fn near_hit(ray: &Ray, sphere: &Sphere) -> Option<Vec3> {
        let ray = Ray::new(ray.origin, ray.direction.try_normalize()?);
        ray_sphere_near_distance(&ray, sphere).map(|t| ray.point_at(t))
    }

    fn try_start(&self, entity: EntityId, device: DeviceType) -> GrabResult<()> {
        let def = self.table.def(entity)?;
        let focus = self.ctx.focus(device)?;
        let world = self.ctx.world_matrix(entity)?;

        let center = self.center(&def);
        let position = world.w_axis.truncate();
        let radius = position.distance(center);
        if radius < MIN_RADIUS {
            return Err(GrabError::DegenerateGeometry {
                entity,
                reason: "entity sits on the sphere center",
            });
        }

        let offset = if def.keep_offset {
            let from = Self::near_hit(&focus.collision_ray, &Sphere::new(center, radius))
                .and_then(|hit| (hit - center).try_normalize());
            if let Some(from) = from {
                Quat::from_rotation_arc(from, (position - center) / radius)
            } else {
                tracing::warn!(entity = ?entity, device = ?device, "start ray misses the grab sphere, offset dropped");
                Quat::IDENTITY
            }
        } else {
            Quat::IDENTITY
        };

        let local_cursor = world.inverse().transform_point3(focus.cursor_position);
        let visibility = self.ctx.hide(device, def.hide_cursor, def.hide_laser);
        self.table.begin(
            entity,
            ActiveGrab {
                device,
                visibility,
                state: SphericalState { radius, offset },
            },
        );
        self.ctx.locker.lock_on(device, entity, local_cursor);
        Ok(())
    }
}

impl GrabInputInterface for SphericalGrabHandler {
    fn start_grab(&self, entity: EntityId, device: DeviceType) -> bool {
        handler::started(entity, device, self.try_start(entity, device))
    }

    fn update_grab(&self, entity: EntityId, device: DeviceType, original: &Mat4) -> Mat4 {
        let (Some(grab), Ok(def), Ok(focus)) = (
            self.table.active(entity),
            self.table.def(entity),
            self.ctx.focus(device),
        ) else {
            return *original;
        };
        let center = self.center(&def);
        let Some(hit) = Self::near_hit(&focus.collision_ray, &Sphere::new(center, grab.state.radius))
        else {
            return *original;
        };

        let target = center + grab.state.offset * (hit - center);
        let mut moved = *original;
        moved.w_axis = target.extend(1.0);
        moved
    }

    fn should_cancel(&self, entity: EntityId, _device: DeviceType) -> bool {
        handler::lost_entity(&self.table, &self.ctx, entity)
    }

    fn end_grab(&self, entity: EntityId, device: DeviceType) {
        handler::finish(&self.table, &self.ctx, entity, device);
    }
}
