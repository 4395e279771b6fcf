//! Ray queries against boxes, spheres, planes and lines.
//!
//! Every query returns `None` for a miss or a degenerate input; callers never
//! see NaN distances.

use glam::{Mat4, Vec3};

use super::shapes::{Aabb, Line, Plane, Ray, Sphere, DEGENERATE_EPSILON};

/// Distance reported by collision queries when nothing was hit.
pub const NO_HIT_DISTANCE: f32 = -1.0;

/// Slab test of a ray against an axis-aligned box.
///
/// Returns the distance along the ray to the entry point, or `0.0` when the
/// ray starts inside the box.
#[must_use]
pub fn ray_aabb_distance(ray: &Ray, aabb: &Aabb) -> Option<f32> {
    if ray.is_degenerate() || !aabb.is_valid() {
        return None;
    }

    let inv_dir = ray.direction.recip();
    let t1 = (aabb.min - ray.origin) * inv_dir;
    let t2 = (aabb.max - ray.origin) * inv_dir;

    // Axes where the ray is parallel and the origin sits on a slab face give
    // 0 * inf = NaN; min/max on f32 drop NaN operands so those axes do not constrain.
    let tmin = t1.min(t2).max_element();
    let tmax = t1.max(t2).min_element();

    if tmax < 0.0 || tmin > tmax {
        None
    } else {
        Some(tmin.max(0.0))
    }
}

/// Slab test against a box placed in the world by `world_from_box`.
///
/// The ray is moved into the box's local space with the inverse transform.
/// The local direction is left unnormalized so the returned parameter is the
/// same distance as along the world ray.
#[must_use]
pub fn ray_obb_distance(ray: &Ray, world_from_box: &Mat4, aabb: &Aabb) -> Option<f32> {
    if world_from_box.determinant().abs() < DEGENERATE_EPSILON {
        return None;
    }
    let box_from_world = world_from_box.inverse();
    let local = Ray::new(
        box_from_world.transform_point3(ray.origin),
        box_from_world.transform_vector3(ray.direction),
    );
    ray_aabb_distance(&local, aabb)
}

/// Near intersection of a ray with a sphere shell.
///
/// Picks the smallest non-negative root: the entry point when the origin is
/// outside the sphere, the exit point when it is inside.
#[must_use]
pub fn ray_sphere_near_distance(ray: &Ray, sphere: &Sphere) -> Option<f32> {
    let a = ray.direction.length_squared();
    if a < DEGENERATE_EPSILON || sphere.radius <= 0.0 {
        return None;
    }
    let to_origin = ray.origin - sphere.center;
    let b = 2.0 * ray.direction.dot(to_origin);
    let c = to_origin.length_squared() - sphere.radius * sphere.radius;

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    let near = (-b - root) / (2.0 * a);
    let far = (-b + root) / (2.0 * a);

    if near >= 0.0 {
        Some(near)
    } else if far >= 0.0 {
        Some(far)
    } else {
        None
    }
}

/// Distance along the ray to a plane, ignoring hits behind the origin.
#[must_use]
pub fn ray_plane_distance(ray: &Ray, plane: &Plane) -> Option<f32> {
    let denom = plane.normal.dot(ray.direction);
    if denom.abs() < 1.0e-6 {
        return None;
    }
    let t = -(plane.normal.dot(ray.origin) + plane.distance) / denom;
    (t >= 0.0).then_some(t)
}

/// Point on `line` closest to the infinite line carrying `ray`.
///
/// The two lines are generally skew, so this is the foot of their common
/// perpendicular on `line`, not an intersection. Parallel lines have no unique
/// answer and return `None`.
#[must_use]
pub fn closest_point_on_line_to_ray(line: &Line, ray: &Ray) -> Option<Vec3> {
    let u = line.direction;
    let v = ray.direction;
    let w0 = line.point - ray.origin;

    let a = u.dot(u);
    let b = u.dot(v);
    let c = v.dot(v);
    let d = u.dot(w0);
    let e = v.dot(w0);

    let denom = a * c - b * b;
    if a < DEGENERATE_EPSILON || c < DEGENERATE_EPSILON || denom.abs() < 1.0e-9 {
        return None;
    }

    let s = (b * e - c * d) / denom;
    Some(line.point + u * s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1.0e-4
    }

    #[test]
    fn test_ray_aabb_hit_and_miss() {
        let aabb = Aabb::new(Vec3::new(9.0, 0.0, -1.0), Vec3::new(11.0, 2.0, 1.0));
        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::X);
        assert!(approx(ray_aabb_distance(&ray, &aabb).unwrap_or(-5.0), 9.0));

        let away = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_X);
        assert_eq!(ray_aabb_distance(&away, &aabb), None);
    }

    #[test]
    fn test_ray_aabb_axis_parallel_on_face() {
        // Origin lies exactly on the y = 0 slab face while travelling along x.
        let aabb = Aabb::new(Vec3::new(1.0, 0.0, -1.0), Vec3::new(2.0, 1.0, 1.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert!(ray_aabb_distance(&ray, &aabb).is_some());
    }

    #[test]
    fn test_ray_obb_uses_world_transform() {
        let aabb = Aabb::from_half_extents(Vec3::splat(0.5));
        let world = Mat4::from_rotation_translation(
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
            Vec3::new(0.0, 0.0, -5.0),
        );
        let ray = Ray::FORWARD;
        let t = ray_obb_distance(&ray, &world, &aabb).unwrap_or(-1.0);
        // Rotated 45 degrees, the nearest corner sits sqrt(0.5) in front of the center.
        assert!(approx(t, 5.0 - 0.5_f32.sqrt()));

        let off_axis = Ray::new(Vec3::new(3.0, 0.0, 0.0), Vec3::NEG_Z);
        assert_eq!(ray_obb_distance(&off_axis, &world, &aabb), None);
    }

    #[test]
    fn test_ray_obb_scaled_distance_matches_world() {
        let aabb = Aabb::from_half_extents(Vec3::splat(0.5));
        let world = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::IDENTITY,
            Vec3::new(0.0, 0.0, -10.0),
        );
        let t = ray_obb_distance(&Ray::FORWARD, &world, &aabb).unwrap_or(-1.0);
        assert!(approx(t, 9.0));
    }

    #[test]
    fn test_ray_sphere_picks_near_root() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, -10.0), 2.0);
        let t = ray_sphere_near_distance(&Ray::FORWARD, &sphere).unwrap_or(-1.0);
        assert!(approx(t, 8.0));
    }

    #[test]
    fn test_ray_sphere_from_inside_uses_exit() {
        let sphere = Sphere::new(Vec3::ZERO, 3.0);
        let t = ray_sphere_near_distance(&Ray::FORWARD, &sphere).unwrap_or(-1.0);
        assert!(approx(t, 3.0));
    }

    #[test]
    fn test_ray_sphere_miss_and_behind() {
        let sphere = Sphere::new(Vec3::new(10.0, 0.0, -10.0), 1.0);
        assert_eq!(ray_sphere_near_distance(&Ray::FORWARD, &sphere), None);

        let behind = Sphere::new(Vec3::new(0.0, 0.0, 10.0), 1.0);
        assert_eq!(ray_sphere_near_distance(&Ray::FORWARD, &behind), None);
    }

    #[test]
    fn test_ray_plane() {
        let plane = Plane::from_point_normal(Vec3::new(0.0, 0.0, -4.0), Vec3::Z);
        assert!(approx(ray_plane_distance(&Ray::FORWARD, &plane).unwrap_or(-1.0), 4.0));

        let parallel = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(ray_plane_distance(&parallel, &plane), None);
    }

    #[test]
    fn test_closest_point_on_skew_line() {
        // Line along x at height 1, ray along -z at height 0: skew.
        let line = Line::new(Vec3::new(0.0, 1.0, -5.0), Vec3::X);
        let ray = Ray::new(Vec3::new(2.0, 0.0, 0.0), Vec3::NEG_Z);
        let point = closest_point_on_line_to_ray(&line, &ray).unwrap_or(Vec3::NAN);
        assert!(approx(point.x, 2.0));
        assert!(approx(point.y, 1.0));
        assert!(approx(point.z, -5.0));
        assert!(line.distance_to_point(point) < 1.0e-5);
    }

    #[test]
    fn test_closest_point_parallel_is_none() {
        let line = Line::new(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Z);
        assert_eq!(closest_point_on_line_to_ray(&line, &Ray::FORWARD), None);
    }
}
