use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};

pub const ROTATION_GAIN: f32 = 0.01;
pub const MOVEMENT_GAIN: f32 = 0.07;
pub const START_POSITION: Vec3 = Vec3::new(0.0, 0.0, -5.0);
pub const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;

pub const FOV_Y_DEGREES: f32 = 70.0;
pub const NEAR: f32 = 0.01;
pub const FAR: f32 = 100.0;

/// First-person camera. Yaw and pitch are in radians.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            position: START_POSITION,
            yaw: 0.0,
            pitch: 0.0,
        }
    }
}

impl CameraState {
    /// Unit look direction derived from yaw and pitch.
    pub fn forward(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vec3::new(sin_yaw * cos_pitch, sin_pitch, cos_yaw * cos_pitch)
    }

    /// Orientation used for movement and for lights attached to the camera.
    pub fn orientation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, -self.pitch, 0.0)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }
}

pub fn projection_matrix(aspect_ratio: f32) -> Mat4 {
    Mat4::perspective_rh(FOV_Y_DEGREES.to_radians(), aspect_ratio, NEAR, FAR)
}

/// Per-update input consumed by [`CameraController`].
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct CameraInput {
    /// Pointer movement, present only while the pointer is captured.
    pub pointer_delta: Option<Vec2>,
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub home: bool,
}

impl CameraInput {
    /// Unnormalized movement in camera space, one unit per active flag.
    fn movement(&self) -> Vec3 {
        let axis = |positive: bool, negative: bool| positive as i32 as f32 - negative as i32 as f32;
        Vec3::new(
            axis(self.left, self.right),
            axis(self.up, self.down),
            axis(self.forward, self.back),
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraController {
    pub rotation_gain: f32,
    pub movement_gain: f32,
}

impl Default for CameraController {
    fn default() -> Self {
        Self {
            rotation_gain: ROTATION_GAIN,
            movement_gain: MOVEMENT_GAIN,
        }
    }
}

impl CameraController {
    pub fn update(&self, camera: &CameraState, input: &CameraInput) -> CameraState {
        let mut next = *camera;

        if let Some(delta) = input.pointer_delta {
            let delta = delta * self.rotation_gain;
            next.yaw -= delta.x;
            next.pitch -= delta.y;

            next.pitch = next.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);

            // One correction per update; per-update deltas never cross twice.
            if next.yaw > PI {
                next.yaw -= TAU;
            } else if next.yaw <= -PI {
                next.yaw += TAU;
            }
        }

        let movement = next.orientation() * input.movement();
        next.position += movement * self.movement_gain;

        if input.home {
            next = CameraState::default();
        }

        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captured(dx: f32, dy: f32) -> CameraInput {
        CameraInput {
            pointer_delta: Some(Vec2::new(dx, dy)),
            ..Default::default()
        }
    }

    #[test]
    fn pointer_delta_turns_by_gain() {
        let camera = CameraController::default().update(&CameraState::default(), &captured(10.0, 0.0));
        assert!((camera.yaw - -0.1).abs() < 1e-6);
        assert_eq!(camera.pitch, 0.0);
    }

    #[test]
    fn absolute_pointer_does_not_rotate() {
        let input = CameraInput::default();
        let camera = CameraController::default().update(&CameraState::default(), &input);
        assert_eq!(camera, CameraState::default());
    }

    #[test]
    fn pitch_is_clamped() {
        let controller = CameraController::default();
        let mut camera = CameraState::default();
        for dy in [-500.0, -500.0, 900.0, 900.0, 900.0, -37.0, 12345.0] {
            camera = controller.update(&camera, &captured(0.0, dy));
            assert!(camera.pitch.abs() <= PITCH_LIMIT);
        }
        assert_eq!(camera.pitch, -PITCH_LIMIT);
    }

    #[test]
    fn yaw_wraps_into_half_open_range() {
        let controller = CameraController::default();
        let mut camera = CameraState::default();
        for _ in 0..1000 {
            camera = controller.update(&camera, &captured(-37.0, 0.0));
            assert!(camera.yaw > -PI && camera.yaw <= PI, "yaw {}", camera.yaw);
        }
        for _ in 0..1000 {
            camera = controller.update(&camera, &captured(53.0, 0.0));
            assert!(camera.yaw > -PI && camera.yaw <= PI, "yaw {}", camera.yaw);
        }
    }

    #[test]
    fn home_resets_regardless_of_state() {
        let controller = CameraController::default();
        let camera = CameraState {
            position: Vec3::new(12.0, -3.0, 40.0),
            yaw: 2.5,
            pitch: -1.2,
        };
        let input = CameraInput {
            pointer_delta: Some(Vec2::new(30.0, 30.0)),
            forward: true,
            up: true,
            home: true,
            ..Default::default()
        };
        let camera = controller.update(&camera, &input);
        assert_eq!(camera.position, START_POSITION);
        assert_eq!(camera.yaw, 0.0);
        assert_eq!(camera.pitch, 0.0);
    }

    #[test]
    fn forward_moves_along_look_direction() {
        let controller = CameraController::default();
        let input = CameraInput {
            forward: true,
            ..Default::default()
        };
        let camera = controller.update(&CameraState::default(), &input);
        assert!((camera.position - Vec3::new(0.0, 0.0, -5.0 + MOVEMENT_GAIN)).length() < 1e-6);

        let turned = CameraState {
            yaw: FRAC_PI_2,
            ..Default::default()
        };
        let camera = controller.update(&turned, &input);
        let moved = camera.position - turned.position;
        assert!((moved - turned.forward() * MOVEMENT_GAIN).length() < 1e-5);
    }

    #[test]
    fn diagonal_movement_is_not_normalized() {
        let controller = CameraController::default();
        let input = CameraInput {
            forward: true,
            left: true,
            ..Default::default()
        };
        let camera = controller.update(&CameraState::default(), &input);
        let moved = camera.position - START_POSITION;
        assert!((moved.length() - MOVEMENT_GAIN * 2f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn view_looks_down_forward() {
        let camera = CameraState::default();
        let target = camera.position + camera.forward() * 3.0;
        let in_view = camera.view_matrix().transform_point3(target);
        // right-handed view space looks down -Z
        assert!(in_view.x.abs() < 1e-5 && in_view.y.abs() < 1e-5);
        assert!((in_view.z - -3.0).abs() < 1e-5);
    }
}
