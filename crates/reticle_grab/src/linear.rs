//! # Linear Grab
//!
//! Slides the entity along a line through the grab point.
//!
//! Each frame the line is rebuilt from the entity's live transform, and the
//! grab point moves to the point of the line closest to the device ray. The
//! two are skew in general, so the result need not lie on the ray.

use std::sync::Arc;

use glam::{Mat4, Vec3};
use reticle_core::{closest_point_on_line_to_ray, EntityId, Line};
use reticle_input::DeviceType;
use serde::{Deserialize, Serialize};

use crate::error::{GrabError, GrabResult};
use crate::handler::{self, ActiveGrab, DefSpace, GrabContext, GrabInputInterface, HandlerTable};
use crate::system::GrabSystem;

/// Per-entity linear grab setup.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearGrabDef {
    /// Line direction.
    pub direction: Vec3,
    /// Frame of `direction`.
    pub space: DefSpace,
    /// Hide the cursor while held.
    pub hide_cursor: bool,
    /// Hide the laser while held.
    pub hide_laser: bool,
}

impl Default for LinearGrabDef {
    fn default() -> Self {
        Self {
            direction: Vec3::X,
            space: DefSpace::World,
            hide_cursor: false,
            hide_laser: false,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct LinearState {
    /// Grab point in entity space.
    local_offset: Vec3,
}

/// Grab handler constraining entities to a line.
pub struct LinearGrabHandler {
    ctx: GrabContext,
    table: HandlerTable<LinearGrabDef, LinearState>,
}

impl LinearGrabHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(ctx: GrabContext) -> Arc<Self> {
        Arc::new(Self {
            ctx,
            table: HandlerTable::new(),
        })
    }

    /// Makes `entity` linearly grabbable and attaches this handler to it.
    pub fn create(self: &Arc<Self>, grabs: &GrabSystem, entity: EntityId, def: LinearGrabDef) {
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

    /// Current world-space line of a held entity.
    #[must_use]
    pub fn grab_line(&self, entity: EntityId) -> Option<Line> {
        let grab = self.table.active(entity)?;
        let def = self.table.def(entity).ok()?;
        let world = self.ctx.transforms.world_matrix(entity)?;
        Self::line(&world, &def, grab.state.local_offset)
    }

    fn line(world: &Mat4, def: &LinearGrabDef, local_offset: Vec3) -> Option<Line> {
        let direction = def.space.world_direction(world, def.direction)?;
        Some(Line::new(world.transform_point3(local_offset), direction))
    }

    fn try_start(&self, entity: EntityId, device: DeviceType) -> GrabResult<()> {
        let def = self.table.def(entity)?;
        let focus = self.ctx.focus(device)?;
        let world = self.ctx.world_matrix(entity)?;

        let direction = def
            .space
            .world_direction(&world, def.direction)
            .ok_or(GrabError::DegenerateGeometry { entity, reason: "zero line direction" })?;
        let line = Line::new(focus.cursor_position, direction);
        let grab_point = closest_point_on_line_to_ray(&line, &focus.collision_ray)
            .ok_or(GrabError::RayMissed(entity))?;

        let entity_from_world = world.inverse();
        let local_offset = entity_from_world.transform_point3(grab_point);
        let local_cursor = entity_from_world.transform_point3(focus.cursor_position);

        let visibility = self.ctx.hide(device, def.hide_cursor, def.hide_laser);
        self.table.begin(
            entity,
            ActiveGrab {
                device,
                visibility,
                state: LinearState { local_offset },
            },
        );
        self.ctx.locker.lock_on(device, entity, local_cursor);
        Ok(())
    }
}

impl GrabInputInterface for LinearGrabHandler {
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
        let offset = grab.state.local_offset;
        let Some(hit) = Self::line(original, &def, offset)
            .and_then(|line| closest_point_on_line_to_ray(&line, &focus.collision_ray))
        else {
            return *original;
        };

        let mut moved = *original;
        moved.w_axis = hit.extend(1.0);
        moved * Mat4::from_translation(-offset)
    }

    fn should_cancel(&self, entity: EntityId, _device: DeviceType) -> bool {
        handler::lost_entity(&self.table, &self.ctx, entity)
    }

    fn end_grab(&self, entity: EntityId, device: DeviceType) {
        handler::finish(&self.table, &self.ctx, entity, device);
    }
}
