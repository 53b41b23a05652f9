//! Perspective camera

use crate::picking::Ray;
use cloudcard_core::config::RenderConfig;
use glam::{Mat4, Vec2, Vec3, Vec4};

/// A perspective camera looking at a target point
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,
    /// Point the camera is looking at
    pub target: Vec3,
    /// Up vector (usually Y-up)
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 8.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: 75.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Create a new camera with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Camera on the +Z axis facing the card, as configured
    pub fn from_config(config: &RenderConfig, aspect: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, config.camera_distance),
            fov: config.fov_degrees.to_radians(),
            aspect,
            ..Default::default()
        }
    }

    /// Get the view matrix (world to camera transform)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Get the projection matrix (depth mapped to 0..1)
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    /// Get the combined view-projection matrix
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Get the forward direction (normalized)
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }

    /// Get distance from camera to target
    pub fn distance(&self) -> f32 {
        (self.position - self.target).length()
    }

    /// Update the aspect ratio after a viewport resize
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// World-space ray through a point in normalized device coordinates
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inverse = self.view_projection_matrix().inverse();
        let unproject = |z: f32| {
            let p = inverse * Vec4::new(ndc.x, ndc.y, z, 1.0);
            p.truncate() / p.w
        };
        let near = unproject(0.0);
        let far = unproject(1.0);
        Ray {
            origin: near,
            direction: (far - near).normalize(),
        }
    }

    /// World-space ray through a pixel of a `viewport`-sized canvas
    pub fn ray_from_screen(&self, pixel: Vec2, viewport: Vec2) -> Ray {
        self.ray_from_ndc(screen_to_ndc(pixel, viewport))
    }

    /// Project a world point to normalized device coordinates
    pub fn project(&self, point: Vec3) -> Vec3 {
        self.view_projection_matrix().project_point3(point)
    }
}

/// Pixel coordinates (origin top-left, y down) to NDC (y up)
pub fn screen_to_ndc(pixel: Vec2, viewport: Vec2) -> Vec2 {
    let viewport = viewport.max(Vec2::ONE);
    Vec2::new(
        pixel.x / viewport.x * 2.0 - 1.0,
        -(pixel.y / viewport.y * 2.0 - 1.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_matches_editor_view() {
        let camera = Camera::default();
        assert_relative_eq!(camera.distance(), 8.0);
        assert_relative_eq!(camera.fov, 75.0_f32.to_radians());
    }

    #[test]
    fn test_center_ray_points_at_target() {
        let camera = Camera::default();
        let ray = camera.ray_from_ndc(Vec2::ZERO);
        assert_relative_eq!(ray.direction.z, -1.0, epsilon = 1e-5);
        assert_relative_eq!(ray.origin.x, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_project_unproject_roundtrip() {
        let camera = Camera::default();
        let point = Vec3::new(1.0, -0.5, 0.0);
        let ndc = camera.project(point);
        let ray = camera.ray_from_ndc(ndc.truncate());
        let hit = ray.intersect_plane(Vec3::ZERO, Vec3::Z).expect("hit");
        assert_relative_eq!(hit.x, 1.0, epsilon = 1e-3);
        assert_relative_eq!(hit.y, -0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_screen_to_ndc() {
        let viewport = Vec2::new(200.0, 100.0);
        assert_eq!(screen_to_ndc(Vec2::new(100.0, 50.0), viewport), Vec2::ZERO);
        assert_eq!(screen_to_ndc(Vec2::ZERO, viewport), Vec2::new(-1.0, 1.0));
    }

    #[test]
    fn test_set_viewport() {
        let mut camera = Camera::default();
        camera.set_viewport(1000, 500);
        assert_relative_eq!(camera.aspect, 2.0);
        camera.set_viewport(0, 500);
        assert_relative_eq!(camera.aspect, 2.0);
    }
}
