use glam::Vec3;

use crate::config::ControlsConfig;
use crate::controller::input::FrameInput;
use crate::model::Camera;

/// Turns one frame of input into a camera pose update.
///
/// `step` applies, in order: keyboard rotation about the start-of-frame
/// basis, then mouse look, then translation along the *post-rotation*
/// basis. Movement therefore always follows where the camera ends up
/// looking this frame, whichever way the rotation came in.
pub struct CameraController {
    /// Units per second.
    pub move_speed: f32,
    /// Degrees per second for the rotation keys.
    pub rot_speed: f32,
    /// Degrees per pixel of mouse travel.
    pub mouse_sensitivity: f32,
}

impl CameraController {
    pub fn new(config: &ControlsConfig) -> Self {
        Self {
            move_speed: config.move_speed,
            rot_speed: config.rot_speed,
            mouse_sensitivity: config.mouse_sensitivity,
        }
    }

    /// Rotation axis from the held rotation keys, as a signed sum of the
    /// basis vectors: i/k pitch about ±right, j/l yaw about ±up. Opposing
    /// keys cancel exactly, leaving the zero axis (a no-op rotation).
    pub fn rotation_axis(input: &FrameInput, right: Vec3, up: Vec3) -> Vec3 {
        let mut axis = Vec3::ZERO;
        if input.rotate_up {
            axis += right;
        }
        if input.rotate_down {
            axis -= right;
        }
        if input.rotate_left {
            axis += up;
        }
        if input.rotate_right {
            axis -= up;
        }
        axis
    }

    /// Unit movement direction from the held movement keys, or zero when
    /// they sum to nothing (opposing keys cancel; normalizing the zero
    /// vector yields zero, never a NaN).
    pub fn move_direction(input: &FrameInput, view: Vec3, right: Vec3) -> Vec3 {
        let mut direction = Vec3::ZERO;
        if input.forward {
            direction += view;
        }
        if input.backward {
            direction -= view;
        }
        if input.right {
            direction += right;
        }
        if input.left {
            direction -= right;
        }
        direction.normalize_or_zero()
    }

    /// Mouse look: horizontal delta yaws about world up, vertical delta
    /// pitches about the freshly recomputed right vector.
    pub fn apply_look(&self, camera: &mut Camera, dx: f32, dy: f32) {
        if dx != 0.0 {
            camera.rotate_about_eye(-dx * self.mouse_sensitivity, Vec3::Y);
        }
        if dy != 0.0 {
            let (_, right) = camera.basis();
            camera.rotate_about_eye(-dy * self.mouse_sensitivity, right);
        }
    }

    /// Advance the pose by one frame of input over `dt` seconds.
    pub fn step(&self, camera: &mut Camera, input: &FrameInput, dt: f32) {
        // keyboard rotation, about the basis as it stood at frame start
        let (_, right) = camera.basis();
        let axis = Self::rotation_axis(input, right, camera.up);
        camera.rotate_about_eye(self.rot_speed * dt, axis);

        let (dx, dy) = input.look;
        self.apply_look(camera, dx, dy);

        // translation uses the basis left behind by both rotations
        let (view, right) = camera.basis();
        let direction = Self::move_direction(input, view, right);
        camera.translate(direction * self.move_speed * dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;

    fn controller() -> CameraController {
        CameraController::new(&ControlsConfig {
            move_speed: 10.0,
            rot_speed: 90.0,
            mouse_sensitivity: 0.15,
        })
    }

    fn camera() -> Camera {
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
    fn idle_input_leaves_the_pose_untouched() {
        let mut cam = camera();
        controller().step(&mut cam, &FrameInput::default(), 0.016);
        assert!(cam.eye.abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), 1e-6));
        assert!(cam.at.abs_diff_eq(Vec3::ZERO, 1e-6));
        assert!(cam.up.abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn forward_moves_exactly_speed_times_dt_along_view() {
        let mut cam = camera();
        let input = FrameInput {
            forward: true,
            ..Default::default()
        };
        controller().step(&mut cam, &input, 0.5);
        // view is -Z; 10 units/s for 0.5 s
        assert!(cam.eye.abs_diff_eq(Vec3::new(0.0, 0.0, 0.0), 1e-5));
        assert!(cam.at.abs_diff_eq(Vec3::new(0.0, 0.0, -5.0), 1e-5));
        assert!(cam.up.abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn opposing_movement_keys_cancel() {
        let mut cam = camera();
        let input = FrameInput {
            forward: true,
            backward: true,
            ..Default::default()
        };
        controller().step(&mut cam, &input, 1.0);
        assert!(cam.eye.abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), 1e-6));
        assert!(cam.at.abs_diff_eq(Vec3::ZERO, 1e-6));
    }

    #[test]
    fn strafe_right_from_the_reference_pose() {
        // eye (0,0,5) looking at the origin: right is +X
        let mut cam = camera();
        let input = FrameInput {
            right: true,
            ..Default::default()
        };
        controller().step(&mut cam, &input, 1.0);
        assert!(cam.eye.abs_diff_eq(Vec3::new(10.0, 0.0, 5.0), 1e-4));
        assert!(cam.at.abs_diff_eq(Vec3::new(10.0, 0.0, 0.0), 1e-4));
    }

    #[test]
    fn diagonal_movement_is_not_faster() {
        let mut cam = camera();
        let input = FrameInput {
            forward: true,
            right: true,
            ..Default::default()
        };
        controller().step(&mut cam, &input, 1.0);
        let moved = cam.eye - Vec3::new(0.0, 0.0, 5.0);
        assert!((moved.length() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn opposing_rotation_keys_cancel() {
        let mut cam = camera();
        let input = FrameInput {
            rotate_up: true,
            rotate_down: true,
            ..Default::default()
        };
        controller().step(&mut cam, &input, 1.0);
        assert!(cam.at.abs_diff_eq(Vec3::ZERO, 1e-6));
        assert!(cam.up.abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn rotate_right_key_turns_a_quarter_clockwise() {
        let mut cam = camera();
        let input = FrameInput {
            rotate_right: true,
            ..Default::default()
        };
        // 90 deg/s for one second
        controller().step(&mut cam, &input, 1.0);
        assert!(cam.eye.abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), 1e-5));
        assert!(cam.at.abs_diff_eq(Vec3::new(5.0, 0.0, 5.0), 1e-4));
        assert!(cam.view_dir().abs_diff_eq(Vec3::X, 1e-5));
    }

    #[test]
    fn mouse_right_yaws_right_about_world_up() {
        let mut cam = camera();
        let input = FrameInput {
            look: (600.0, 0.0), // 600 px * 0.15 deg/px = 90 degrees
            ..Default::default()
        };
        controller().step(&mut cam, &input, 1.0);
        assert!(cam.view_dir().abs_diff_eq(Vec3::X, 1e-5));
        assert!(cam.up.abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn mouse_down_pitches_down_about_right() {
        let mut cam = camera();
        let input = FrameInput {
            look: (0.0, 600.0),
            ..Default::default()
        };
        controller().step(&mut cam, &input, 1.0);
        assert!(cam.view_dir().abs_diff_eq(Vec3::NEG_Y, 1e-5));
    }

    #[test]
    fn rotation_applies_before_translation() {
        let mut cam = camera();
        let input = FrameInput {
            forward: true,
            rotate_right: true,
            ..Default::default()
        };
        controller().step(&mut cam, &input, 1.0);
        // quarter turn to +X first, then 10 units forward along +X
        assert!(cam.eye.abs_diff_eq(Vec3::new(10.0, 0.0, 5.0), 1e-4));
        assert!(cam.view_dir().abs_diff_eq(Vec3::X, 1e-5));
    }

    #[test]
    fn move_direction_of_nothing_is_zero() {
        let dir = CameraController::move_direction(&FrameInput::default(), Vec3::NEG_Z, Vec3::X);
        assert_eq!(dir, Vec3::ZERO);
    }

    #[test]
    fn rotation_axis_accumulates_signed_contributions() {
        let input = FrameInput {
            rotate_up: true,
            rotate_left: true,
            ..Default::default()
        };
        let axis = CameraController::rotation_axis(&input, Vec3::X, Vec3::Y);
        assert!(axis.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-6));
    }
}
