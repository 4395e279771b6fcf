//! # Ray Math
//!
//! Shapes and ray queries shared by collision, dead-zone tests and grabbing.
//!
//! ```text
//!   ray ──► slab test ──────► Aabb / OBB      (collision, dead zones)
//!       ──► near root ──────► Sphere          (spherical grab)
//!       ──► plane hit ──────► Plane           (planar grab)
//!       ──► skew closest ───► Line            (linear grab)
//! ```

mod intersect;
mod shapes;

pub use intersect::{
    closest_point_on_line_to_ray, ray_aabb_distance, ray_obb_distance, ray_plane_distance,
    ray_sphere_near_distance, NO_HIT_DISTANCE,
};
pub use shapes::{Aabb, Line, Plane, Ray, Sphere};
