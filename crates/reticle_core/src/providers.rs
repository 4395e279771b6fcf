//! # Collaborator Interfaces
//!
//! The focus pipeline never owns scene data. Everything it needs from the
//! outside world comes through these traits, and every method takes `&self`
//! so a single collaborator can be shared behind an `Arc` by the pipeline,
//! the behavior resolver and the grab handlers at once.

use glam::{Mat4, Vec2, Vec3};

use crate::entity::EntityId;
use crate::math::{Aabb, Ray, NO_HIT_DISTANCE};

/// Scene hierarchy and transform access.
pub trait TransformProvider: Send + Sync {
    /// World matrix of an entity, `None` if it has no transform.
    fn world_matrix(&self, entity: EntityId) -> Option<Mat4>;

    /// Parent of an entity, `EntityId::NULL` for roots and unknown entities.
    fn parent(&self, entity: EntityId) -> EntityId;

    /// Translation relative to the parent.
    fn local_translation(&self, entity: EntityId) -> Option<Vec3>;

    /// Moves an entity so that its world matrix equals `matrix`.
    fn set_world_matrix(&self, entity: EntityId, matrix: &Mat4);

    /// True when the entity and all of its ancestors are enabled.
    fn is_enabled(&self, entity: EntityId) -> bool;

    /// Enables an entity.
    fn enable(&self, entity: EntityId);

    /// Disables an entity.
    fn disable(&self, entity: EntityId);

    /// Local-space bounding box, `None` if the entity has no extent.
    fn aabb(&self, entity: EntityId) -> Option<Aabb>;
}

/// Nearest hit reported by a [`CollisionProvider`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionResult {
    /// Entity that was hit, null on a miss.
    pub entity: EntityId,
    /// Distance along the ray, [`NO_HIT_DISTANCE`] on a miss.
    pub distance: f32,
}

impl CollisionResult {
    /// Nothing was hit.
    pub const MISS: Self = Self {
        entity: EntityId::NULL,
        distance: NO_HIT_DISTANCE,
    };

    /// Creates a hit result.
    #[inline]
    #[must_use]
    pub const fn hit(entity: EntityId, distance: f32) -> Self {
        Self { entity, distance }
    }

    /// True when an entity was hit.
    #[inline]
    #[must_use]
    pub const fn is_hit(&self) -> bool {
        !self.entity.is_null()
    }
}

impl Default for CollisionResult {
    fn default() -> Self {
        Self::MISS
    }
}

/// Ray casting against scene geometry.
pub trait CollisionProvider: Send + Sync {
    /// Nearest entity intersected by `ray`.
    fn check_for_collision(&self, ray: &Ray) -> CollisionResult;

    /// Whether the entity currently accepts interaction.
    fn is_interaction_enabled(&self, entity: EntityId) -> bool;
}

/// Touchscreen unprojection.
pub trait ScreenProjector: Send + Sync {
    /// World ray through a normalized screen point (`[0, 1]` on both axes,
    /// origin at the top left). `None` outside the screen.
    fn world_ray_from_screen(&self, point: Vec2) -> Option<Ray>;
}
