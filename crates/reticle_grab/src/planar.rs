//! # Planar Grab
//!
//! Translates the entity within a plane through the grab point. Rotation and
//! scale are untouched; the plane normal is fixed in the world or follows
//! the entity.

use std::sync::Arc;

use glam::{Mat4, Vec3};
use reticle_core::{ray_plane_distance, EntityId, Plane, Ray};
use reticle_input::DeviceType;
use serde::{Deserialize, Serialize};

use crate::error::{GrabError, GrabResult};
use crate::handler::{self, ActiveGrab, DefSpace, GrabContext, GrabInputInterface, HandlerTable};
use crate::system::GrabSystem;

/// Per-entity planar grab setup.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanarGrabDef {
    /// Plane normal.
    pub normal: Vec3,
    /// Frame of `normal`.
    pub space: DefSpace,
    /// Cancel once the ray points this far (degrees) away from the entity.
    pub break_angle_degrees: Option<f32>,
    /// Hide the cursor while held.
    pub hide_cursor: bool,
    /// Hide the laser while held.
    pub hide_laser: bool,
}

impl Default for PlanarGrabDef {
    fn default() -> Self {
        Self {
            normal: Vec3::Z,
            space: DefSpace::World,
            break_angle_degrees: None,
            hide_cursor: false,
            hide_laser: false,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct PlanarState {
    /// Grab point in entity space.
    anchor: Vec3,
}

/// Grab handler constraining entities to a plane.
pub struct PlanarGrabHandler {
    ctx: GrabContext,
    table: HandlerTable<PlanarGrabDef, PlanarState>,
}

impl PlanarGrabHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(ctx: GrabContext) -> Arc<Self> {
        Arc::new(Self {
            ctx,
            table: HandlerTable::new(),
        })
    }

    /// Makes `entity` grabbable in a plane and attaches this handler to it.
    pub fn create(self: &Arc<Self>, grabs: &GrabSystem, entity: EntityId, def: PlanarGrabDef) {
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

    /// World plane through the grab point of a held entity.
    #[must_use]
    pub fn grab_plane(&self, entity: EntityId) -> Option<Plane> {
        let grab = self.table.active(entity)?;
        let def = self.table.def(entity).ok()?;
        let world = self.ctx.transforms.world_matrix(entity)?;
        Self::plane(&world, &def, grab.state.anchor)
    }

    fn plane(world: &Mat4, def: &PlanarGrabDef, anchor: Vec3) -> Option<Plane> {
        let normal = def.space.world_direction(world, def.normal)?;
        Some(Plane::from_point_normal(world.transform_point3(anchor), normal))
    }

    fn hit(plane: &Plane, ray: &Ray) -> Option<Vec3> {
        let ray = Ray::new(ray.origin, ray.direction.try_normalize()?);
        ray_plane_distance(&ray, plane).map(|t| ray.point_at(t))
    }

    fn try_start(&self, entity: EntityId, device: DeviceType) -> GrabResult<()> {
        let def = self.table.def(entity)?;
        let focus = self.ctx.focus(device)?;
        let world = self.ctx.world_matrix(entity)?;

        let normal = def
            .space
            .world_direction(&world, def.normal)
            .ok_or(GrabError::DegenerateGeometry { entity, reason: "zero plane normal" })?;
        let plane = Plane::from_point_normal(focus.cursor_position, normal);
        let grab_point = Self::hit(&plane, &focus.collision_ray).ok_or(GrabError::RayMissed(entity))?;

        let entity_from_world = world.inverse();
        let anchor = entity_from_world.transform_point3(grab_point);
        let local_cursor = entity_from_world.transform_point3(focus.cursor_position);

        let visibility = self.ctx.hide(device, def.hide_cursor, def.hide_laser);
        self.table.begin(
            entity,
            ActiveGrab {
                device,
                visibility,
                state: PlanarState { anchor },
            },
        );
        self.ctx.locker.lock_on(device, entity, local_cursor);
        Ok(())
    }

    fn past_break_angle(&self, entity: EntityId, device: DeviceType, break_degrees: f32) -> bool {
        let (Ok(focus), Ok(world)) = (self.ctx.focus(device), self.ctx.world_matrix(entity)) else {
            return true;
        };
        let ray = focus.collision_ray;
        let to_entity = world.w_axis.truncate() - ray.origin;
        if ray.is_degenerate() || to_entity.length_squared() < f32::EPSILON {
            return false;
        }
        ray.direction.angle_between(to_entity) >= break_degrees.to_radians()
    }
}

impl GrabInputInterface for PlanarGrabHandler {
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
        let anchor = original.transform_point3(grab.state.anchor);
        let Some(hit) = Self::plane(original, &def, grab.state.anchor)
            .and_then(|plane| Self::hit(&plane, &focus.collision_ray))
        else {
            return *original;
        };
        Mat4::from_translation(hit - anchor) * *original
    }

    fn should_cancel(&self, entity: EntityId, device: DeviceType) -> bool {
        if handler::lost_entity(&self.table, &self.ctx, entity) {
            return true;
        }
        self.table
            .def(entity)
            .ok()
            .and_then(|def| def.break_angle_degrees)
            .is_some_and(|degrees| self.past_break_angle(entity, device, degrees))
    }

    fn end_grab(&self, entity: EntityId, device: DeviceType) {
        handler::finish(&self.table, &self.ctx, entity, device);
    }
}
