//! # Input Behaviors
//!
//! Per-entity rules applied after collision:
//!
//! ```text
//!   hit entity ──► FindAncestor? ──► walk parents to HandleDescendants
//!              ──► target change? ──► dead zone: re-test ray against the
//!                                     shrunk local box, miss → no target
//!              ──► draggable flag from the final target
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec3;
use parking_lot::RwLock;
use reticle_core::{ray_obb_distance, EntityId, Ray, TransformProvider};
use serde::{Deserialize, Serialize};

use crate::error::{FocusError, FocusResult};
use crate::focus::InputFocus;

/// Upper bound on parent walks; deeper chains are treated as malformed.
const MAX_ANCESTOR_WALK: usize = 256;

/// How an entity takes part in focus resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusBehavior {
    /// The entity is its own target.
    #[default]
    HandleAlone,
    /// Focus goes to the nearest ancestor that handles descendants.
    FindAncestor,
    /// Takes focus for descendants that find their ancestor.
    HandleDescendants,
}

/// Behavior record of one entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputBehavior {
    /// Focus rule.
    pub behavior: FocusBehavior,
    /// Amount the local box shrinks on each side before focus may start.
    pub dead_zone: Vec3,
    /// Whether a press may turn into a drag.
    pub draggable: bool,
}

/// Applies [`InputBehavior`]s to a resolved focus.
pub struct InputBehaviorResolver {
    transforms: Option<Arc<dyn TransformProvider>>,
    behaviors: RwLock<HashMap<EntityId, InputBehavior>>,
}

impl InputBehaviorResolver {
    /// Creates an empty behavior table.
    #[must_use]
    pub fn new(transforms: Option<Arc<dyn TransformProvider>>) -> Self {
        Self {
            transforms,
            behaviors: RwLock::new(HashMap::new()),
        }
    }

    // =========================================================================
    // Table
    // =========================================================================

    /// Sets the whole record of `entity`.
    pub fn set_behavior(&self, entity: EntityId, behavior: InputBehavior) {
        self.behaviors.write().insert(entity, behavior);
    }

    /// Record of `entity`.
    #[must_use]
    pub fn behavior(&self, entity: EntityId) -> Option<InputBehavior> {
        self.behaviors.read().get(&entity).copied()
    }

    /// Sets the focus rule, creating the record if needed.
    pub fn set_focus_behavior(&self, entity: EntityId, behavior: FocusBehavior) {
        self.behaviors.write().entry(entity).or_default().behavior = behavior;
    }

    /// Sets the dead zone, creating the record if needed.
    pub fn set_dead_zone(&self, entity: EntityId, dead_zone: Vec3) {
        self.behaviors.write().entry(entity).or_default().dead_zone = dead_zone;
    }

    /// Sets the draggable flag, creating the record if needed.
    pub fn set_draggable(&self, entity: EntityId, draggable: bool) {
        self.behaviors.write().entry(entity).or_default().draggable = draggable;
    }

    /// Draggable flag; false without a record.
    #[must_use]
    pub fn is_draggable(&self, entity: EntityId) -> bool {
        self.behavior(entity).is_some_and(|b| b.draggable)
    }

    /// Removes the record of `entity`.
    pub fn remove(&self, entity: EntityId) {
        self.behaviors.write().remove(&entity);
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Finalizes `focus.target`.
    ///
    /// `previous` is the final focus of the same device last frame. The dead
    /// zone is only tested when the target differs from it; with no previous
    /// focus the target always counts as changing.
    pub fn update_input_focus(&self, focus: &mut InputFocus, previous: Option<&InputFocus>) {
        let original = focus.target;
        focus.target = self.handle_behavior(original);

        let changing = previous.map_or(true, |previous| previous.target != focus.target);
        if changing && self.is_inside_dead_zone(original, &focus.collision_ray) {
            focus.target = EntityId::NULL;
        }

        if !focus.target.is_null() {
            focus.draggable = self.is_draggable(focus.target);
        }
    }

    /// Entity that receives focus when `entity` is hit.
    ///
    /// A `FindAncestor` entity with no handling ancestor logs a configuration
    /// error and keeps focus itself.
    #[must_use]
    pub fn handle_behavior(&self, entity: EntityId) -> EntityId {
        match self.find_handling_ancestor(entity) {
            Ok(target) => target,
            Err(error) => {
                tracing::error!(entity = ?entity, %error, "input behavior misconfigured");
                entity
            }
        }
    }

    fn find_handling_ancestor(&self, entity: EntityId) -> FocusResult<EntityId> {
        let finds_ancestor = self
            .behavior(entity)
            .is_some_and(|b| b.behavior == FocusBehavior::FindAncestor);
        if !finds_ancestor {
            return Ok(entity);
        }
        let Some(transforms) = self.transforms.as_ref() else {
            return Err(FocusError::NoHandlingAncestor(entity));
        };

        let mut parent = transforms.parent(entity);
        for _ in 0..MAX_ANCESTOR_WALK {
            if parent.is_null() {
                break;
            }
            let handles = self
                .behavior(parent)
                .is_some_and(|b| b.behavior == FocusBehavior::HandleDescendants);
            if handles {
                return Ok(parent);
            }
            parent = transforms.parent(parent);
        }
        Err(FocusError::NoHandlingAncestor(entity))
    }

    /// True when `entity` has a dead zone and `ray` misses its shrunk box.
    ///
    /// Entities without a transform or box log a configuration error and never
    /// suppress focus.
    #[must_use]
    pub fn is_inside_dead_zone(&self, entity: EntityId, ray: &Ray) -> bool {
        let Some(dead_zone) = self
            .behavior(entity)
            .map(|b| b.dead_zone)
            .filter(|zone| *zone != Vec3::ZERO)
        else {
            return false;
        };
        match self.misses_shrunk_box(entity, dead_zone, ray) {
            Ok(misses) => misses,
            Err(error) => {
                tracing::error!(entity = ?entity, %error, "dead zone needs a transform and a bounding box");
                false
            }
        }
    }

    fn misses_shrunk_box(&self, entity: EntityId, dead_zone: Vec3, ray: &Ray) -> FocusResult<bool> {
        let transforms = self
            .transforms
            .as_ref()
            .ok_or(FocusError::MissingTransform(entity))?;
        let world = transforms
            .world_matrix(entity)
            .ok_or(FocusError::MissingTransform(entity))?;
        let aabb = transforms.aabb(entity).ok_or(FocusError::MissingAabb(entity))?;

        Ok(ray_obb_distance(ray, &world, &aabb.shrunk(dead_zone)).is_none())
    }
}
