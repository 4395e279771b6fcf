//! # Collision Resolution
//!
//! Nearest hit for a ray, with a manual override used by tools and tests to
//! force a target without any geometry.

use std::sync::Arc;

use parking_lot::Mutex;
use reticle_core::{CollisionProvider, CollisionResult, EntityId, Ray};

/// Wraps an optional [`CollisionProvider`].
pub struct CollisionResolver {
    provider: Option<Arc<dyn CollisionProvider>>,
    manual: Mutex<Option<CollisionResult>>,
}

impl CollisionResolver {
    /// Creates a resolver. Without a provider every ray misses.
    #[must_use]
    pub fn new(provider: Option<Arc<dyn CollisionProvider>>) -> Self {
        Self {
            provider,
            manual: Mutex::new(None),
        }
    }

    /// Makes `resolve` return `(entity, depth)` for every ray.
    pub fn start_manual_collision(&self, entity: EntityId, depth: f32) {
        *self.manual.lock() = Some(CollisionResult::hit(entity, depth));
    }

    /// Returns to geometric collision.
    pub fn stop_manual_collision(&self) {
        *self.manual.lock() = None;
    }

    /// Active manual override.
    #[must_use]
    pub fn manual_collision(&self) -> Option<CollisionResult> {
        *self.manual.lock()
    }

    /// Nearest hit along `ray`, or [`CollisionResult::MISS`].
    ///
    /// The manual override wins over everything, including zero-length rays.
    #[must_use]
    pub fn resolve(&self, ray: &Ray) -> CollisionResult {
        if let Some(manual) = self.manual_collision() {
            return manual;
        }
        if ray.is_degenerate() {
            return CollisionResult::MISS;
        }
        self.provider
            .as_ref()
            .map_or(CollisionResult::MISS, |provider| provider.check_for_collision(ray))
    }

    /// Whether `entity` accepts interaction. Null never does; without a
    /// provider every other entity does.
    #[must_use]
    pub fn is_interaction_enabled(&self, entity: EntityId) -> bool {
        if entity.is_null() {
            return false;
        }
        self.provider
            .as_ref()
            .map_or(true, |provider| provider.is_interaction_enabled(entity))
    }
}
