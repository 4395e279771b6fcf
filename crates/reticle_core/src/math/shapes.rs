//! Value types for the shapes the pipeline tests rays against.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Squared length below which a direction is treated as zero.
pub(crate) const DEGENERATE_EPSILON: f32 = 1.0e-12;

/// A ray in 3D space.
///
/// The direction is expected to be unit length for distances to be in world
/// units. A zero direction marks a ray that must not be collided (for example a
/// touchscreen with no active touch).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    /// Start of the ray.
    pub origin: Vec3,
    /// Direction of travel.
    pub direction: Vec3,
}

impl Ray {
    /// Default device selection ray: from the origin looking down `-Z`.
    pub const FORWARD: Self = Self {
        origin: Vec3::ZERO,
        direction: Vec3::NEG_Z,
    };

    /// Ray with no direction.
    pub const ZERO: Self = Self {
        origin: Vec3::ZERO,
        direction: Vec3::ZERO,
    };

    /// Creates a ray. The direction is used as given.
    #[inline]
    #[must_use]
    pub const fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Point at parameter `t` along the ray.
    #[inline]
    #[must_use]
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// True when the direction has (near) zero length.
    #[inline]
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.direction.length_squared() < DEGENERATE_EPSILON
    }

    /// Transforms the ray by an affine matrix. The direction is re-normalized.
    #[must_use]
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self {
            origin: matrix.transform_point3(self.origin),
            direction: matrix.transform_vector3(self.direction).normalize_or_zero(),
        }
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self::FORWARD
    }
}

/// Axis-aligned bounding box in an entity's local space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Creates a box from its corners.
    #[inline]
    #[must_use]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box centered on the origin with the given half extents.
    #[inline]
    #[must_use]
    pub fn from_half_extents(half_extents: Vec3) -> Self {
        Self {
            min: -half_extents,
            max: half_extents,
        }
    }

    /// Shrinks the box symmetrically by `margin` on every axis.
    ///
    /// A margin larger than half the box yields an inverted (empty) box.
    #[inline]
    #[must_use]
    pub fn shrunk(&self, margin: Vec3) -> Self {
        Self {
            min: self.min + margin,
            max: self.max - margin,
        }
    }

    /// False when any axis is inverted.
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    /// Center of the box.
    #[inline]
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns true if a point is inside the box (inclusive).
    #[inline]
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// Infinite line through `point` along `direction`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line {
    /// A point on the line.
    pub point: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl Line {
    /// Creates a line. The direction is normalized (zero stays zero).
    #[inline]
    #[must_use]
    pub fn new(point: Vec3, direction: Vec3) -> Self {
        Self {
            point,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Shortest distance from `point` to the line.
    #[must_use]
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        let offset = point - self.point;
        let along = offset.dot(self.direction);
        (offset - self.direction * along).length()
    }
}

/// Sphere shell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    /// Center in world space.
    pub center: Vec3,
    /// Radius.
    pub radius: f32,
}

impl Sphere {
    /// Creates a sphere.
    #[inline]
    #[must_use]
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// Plane `normal . p + distance = 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    /// Unit normal.
    pub normal: Vec3,
    /// Signed offset from the origin.
    pub distance: f32,
}

impl Plane {
    /// Plane through `point` with the given normal (normalized here).
    #[must_use]
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize_or_zero();
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }

    /// Signed distance from `point` to the plane.
    #[inline]
    #[must_use]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}
