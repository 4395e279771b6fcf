//! Perspective camera used to unproject touchscreen points.

use glam::{Mat4, Vec2, Vec3};
use parking_lot::RwLock;

use crate::error::{CoreError, CoreResult};
use crate::math::Ray;
use crate::providers::ScreenProjector;

/// Pinhole camera looking down its local `-Z`.
#[derive(Debug)]
pub struct PerspectiveCamera {
    world_from_camera: RwLock<Mat4>,
    /// `tan(fov_y / 2)`.
    tan_half_fov: f32,
    aspect: f32,
}

impl PerspectiveCamera {
    /// Creates a camera.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidCamera`] if the vertical field of view is outside
    /// `(0, PI)` or the aspect ratio is not positive.
    pub fn new(world_from_camera: Mat4, fov_y_radians: f32, aspect: f32) -> CoreResult<Self> {
        if !(fov_y_radians > 0.0 && fov_y_radians < std::f32::consts::PI) {
            return Err(CoreError::InvalidCamera(format!(
                "vertical fov {fov_y_radians} out of range"
            )));
        }
        if !(aspect > 0.0 && aspect.is_finite()) {
            return Err(CoreError::InvalidCamera(format!("aspect {aspect} must be positive")));
        }
        Ok(Self {
            world_from_camera: RwLock::new(world_from_camera),
            tan_half_fov: (fov_y_radians * 0.5).tan(),
            aspect,
        })
    }

    /// Moves the camera.
    pub fn set_pose(&self, world_from_camera: Mat4) {
        *self.world_from_camera.write() = world_from_camera;
    }

    /// Current camera pose.
    #[must_use]
    pub fn pose(&self) -> Mat4 {
        *self.world_from_camera.read()
    }
}

impl ScreenProjector for PerspectiveCamera {
    fn world_ray_from_screen(&self, point: Vec2) -> Option<Ray> {
        if !(0.0..=1.0).contains(&point.x) || !(0.0..=1.0).contains(&point.y) {
            return None;
        }
        // Screen y grows downward, NDC y grows upward.
        let ndc = Vec2::new(point.x * 2.0 - 1.0, 1.0 - point.y * 2.0);
        let direction = Vec3::new(
            ndc.x * self.tan_half_fov * self.aspect,
            ndc.y * self.tan_half_fov,
            -1.0,
        );
        Some(Ray::new(Vec3::ZERO, direction).transformed(&self.pose()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_of_screen_looks_forward() {
        let camera = PerspectiveCamera::new(
            Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)),
            std::f32::consts::FRAC_PI_2,
            1.0,
        )
        .unwrap();
        let ray = camera.world_ray_from_screen(Vec2::splat(0.5)).unwrap();
        assert_eq!(ray.origin, Vec3::new(0.0, 1.0, 0.0));
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn test_top_left_corner() {
        let camera =
            PerspectiveCamera::new(Mat4::IDENTITY, std::f32::consts::FRAC_PI_2, 1.0).unwrap();
        let ray = camera.world_ray_from_screen(Vec2::ZERO).unwrap();
        let expected = Vec3::new(-1.0, 1.0, -1.0).normalize();
        assert!((ray.direction - expected).length() < 1e-5);
    }

    #[test]
    fn test_off_screen_and_invalid_camera() {
        let camera =
            PerspectiveCamera::new(Mat4::IDENTITY, std::f32::consts::FRAC_PI_2, 1.0).unwrap();
        assert!(camera.world_ray_from_screen(Vec2::new(-1.0, -1.0)).is_none());
        assert!(PerspectiveCamera::new(Mat4::IDENTITY, 0.0, 1.0).is_err());
        assert!(PerspectiveCamera::new(Mat4::IDENTITY, 1.0, 0.0).is_err());
    }
}
