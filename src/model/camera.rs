use glam::{Mat4, Quat, Vec3};

use crate::config::CameraConfig;

/// Free camera pose: eye/at/up plus projection parameters.
///
/// Invariants (`eye != at`, `up` never parallel to `at - eye`) are enforced
/// when the scene file is validated; the per-frame math assumes them.
pub struct Camera {
    pub eye: Vec3,
    pub at: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(config: &CameraConfig, width: u32, height: u32) -> Self {
        Self {
            eye: Vec3::from(config.eye),
            at: Vec3::from(config.at),
            up: Vec3::from(config.up).normalize(),
            fov_y: config.fov.to_radians(),
            aspect: width as f32 / height as f32,
            z_near: config.near,
            z_far: config.far,
        }
    }

    pub fn view_dir(&self) -> Vec3 {
        (self.at - self.eye).normalize()
    }

    /// Orthonormal movement basis: (view, right).
    pub fn basis(&self) -> (Vec3, Vec3) {
        let view = self.view_dir();
        (view, view.cross(self.up).normalize())
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.at, self.up)
    }

    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.proj() * self.view()
    }

    /// Rotate the look direction and `up` about an axis through the eye.
    /// The eye itself never moves; a zero angle or a (near-)zero axis is a
    /// no-op rather than feeding a degenerate axis into the rotation.
    pub fn rotate_about_eye(&mut self, angle_deg: f32, axis: Vec3) {
        if angle_deg == 0.0 || axis.length_squared() < 1e-12 {
            return;
        }
        let rotation = Quat::from_axis_angle(axis.normalize(), angle_deg.to_radians());
        let view = self.at - self.eye;
        self.at = self.eye + rotation * view;
        self.up = rotation * self.up;
    }

    /// Move eye and at together, keeping the look direction.
    pub fn translate(&mut self, delta: Vec3) {
        self.eye += delta;
        self.at += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_camera() -> Camera {
        Camera::new(
            &CameraConfig {
                eye: [0.0, 0.0, 5.0],
                at: [0.0, 0.0, 0.0],
                up: [0.0, 1.0, 0.0],
                fov: 60.0,
                near: 1.0,
                far: 100.0,
            },
            800,
            600,
        )
    }

    #[test]
    fn basis_is_orthonormal() {
        let cam = test_camera();
        let (view, right) = cam.basis();
        assert!(view.abs_diff_eq(Vec3::NEG_Z, 1e-6));
        assert!(right.abs_diff_eq(Vec3::X, 1e-6));
        assert!(view.dot(right).abs() < 1e-6);
    }

    #[test]
    fn zero_angle_rotation_is_identity() {
        let mut cam = test_camera();
        cam.rotate_about_eye(0.0, Vec3::new(0.3, 0.8, -0.1));
        assert!(cam.at.abs_diff_eq(Vec3::ZERO, 1e-6));
        assert!(cam.up.abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn zero_axis_rotation_is_identity() {
        let mut cam = test_camera();
        cam.rotate_about_eye(42.0, Vec3::ZERO);
        assert!(cam.at.abs_diff_eq(Vec3::ZERO, 1e-6));
        assert!(cam.up.abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn quarter_turn_about_up_swings_the_look_target() {
        let mut cam = test_camera();
        cam.rotate_about_eye(90.0, Vec3::Y);
        assert!(cam.eye.abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), 1e-5), "eye must not move");
        assert!(cam.at.abs_diff_eq(Vec3::new(-5.0, 0.0, 5.0), 1e-4));
        assert!(cam.up.abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn pitch_rotates_up_along_with_the_view() {
        let mut cam = test_camera();
        let (_, right) = cam.basis();
        cam.rotate_about_eye(90.0, right);
        // looking straight up now, with up tipped backwards
        assert!(cam.at.abs_diff_eq(Vec3::new(0.0, 5.0, 5.0), 1e-4));
        assert!(cam.up.abs_diff_eq(Vec3::Z, 1e-5));
    }

    #[test]
    fn translate_moves_eye_and_at_together() {
        let mut cam = test_camera();
        cam.translate(Vec3::new(1.0, 2.0, 3.0));
        assert!(cam.eye.abs_diff_eq(Vec3::new(1.0, 2.0, 8.0), 1e-6));
        assert!(cam.at.abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-6));
        assert!(cam.view_dir().abs_diff_eq(Vec3::NEG_Z, 1e-6));
    }
}
