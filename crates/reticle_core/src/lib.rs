//! # RETICLE Core
//!
//! Shared kernel for the input focus pipeline:
//! - Entity ids with an explicit null
//! - Ray, box, line, sphere and plane math for collision and grabbing
//! - A triple buffer with lock-free slot rotation for per-device state
//! - Collaborator traits the pipeline consumes (transforms, collision, screen projection)
//! - An in-memory scene hierarchy that implements those traits
//!
//! ## Architecture Rules
//!
//! 1. **No unsafe code** - slot rotation is an atomic index over locked slots
//! 2. **Collaborators are traits** - the pipeline never reaches into a concrete scene
//! 3. **Math is total** - degenerate inputs return `None`, never NaN positions
//!
//! ## Example
//!
//! ```rust,ignore
//! use reticle_core::{Ray, Scene, CollisionProvider};
//!
//! let scene = Scene::new();
//! let hit = scene.check_for_collision(&Ray::new(Vec3::ZERO, Vec3::NEG_Z));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod entity;
pub mod error;
pub mod math;
pub mod providers;
pub mod scene;
pub mod sync;

pub use entity::EntityId;
pub use error::{CoreError, CoreResult};
pub use math::{
    closest_point_on_line_to_ray, ray_aabb_distance, ray_obb_distance, ray_plane_distance,
    ray_sphere_near_distance, Aabb, Line, Plane, Ray, Sphere, NO_HIT_DISTANCE,
};
pub use providers::{CollisionProvider, CollisionResult, ScreenProjector, TransformProvider};
pub use scene::{PerspectiveCamera, Scene};
pub use sync::{SlotReadHandle, SlotWriteHandle, TripleBuffer};

pub use glam;
