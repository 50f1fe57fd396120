//! Keyboard-driven free camera.

use std::collections::HashSet;

use lakeview_core::camera::FlyCamera;
use lakeview_core::config::CameraConfig;
use lakeview_core::Result;
use winit::keyboard::KeyCode;

/// Camera controls held down during an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraInput {
    pub look_up: bool,
    pub look_down: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    pub forward: bool,
    pub back: bool,
    pub strafe_left: bool,
    pub strafe_right: bool,
    pub reset: bool,
}

impl CameraInput {
    #[must_use]
    pub fn from_keys(keys: &HashSet<KeyCode>) -> Self {
        let down = |code| keys.contains(&code);
        Self {
            look_up: down(KeyCode::ArrowUp),
            look_down: down(KeyCode::ArrowDown),
            turn_left: down(KeyCode::ArrowLeft),
            turn_right: down(KeyCode::ArrowRight),
            forward: down(KeyCode::KeyW),
            back: down(KeyCode::KeyS),
            strafe_left: down(KeyCode::KeyA),
            strafe_right: down(KeyCode::KeyD),
            reset: down(KeyCode::KeyR),
        }
    }
}

fn axis(positive: bool, negative: bool) -> f32 {
    f32::from(u8::from(positive)) - f32::from(u8::from(negative))
}

/// Moves a [`FlyCamera`] from held keys, scaled by the elapsed milliseconds.
#[derive(Debug, Clone)]
pub struct FreeCameraController {
    settings: CameraConfig,
}

impl FreeCameraController {
    #[must_use]
    pub fn new(settings: CameraConfig) -> Self {
        Self { settings }
    }

    /// The camera at its configured start pose.
    pub fn initial_camera(&self) -> Result<FlyCamera> {
        FlyCamera::new(self.settings.position, self.settings.forward)
    }

    /// Applies one update. Rotation that would tip the camera over is dropped; the
    /// position eases towards the moved target by the smoothing factor.
    pub fn update(&self, camera: &mut FlyCamera, input: CameraInput, elapsed_ms: f32) -> Result<()> {
        if input.reset {
            return camera.reset(self.settings.reset_position, self.settings.forward);
        }

        let turn_step = elapsed_ms * self.settings.turn_speed;
        let pitch = axis(input.look_up, input.look_down) * turn_step;
        let turn = axis(input.turn_left, input.turn_right) * turn_step;
        if (pitch != 0.0 || turn != 0.0) && !camera.rotate(pitch, turn) {
            log::trace!("camera rotation rejected at the pitch limit");
        }

        let move_step = elapsed_ms * self.settings.move_speed;
        let offset = camera.forward() * axis(input.forward, input.back) * move_step
            + camera.right() * axis(input.strafe_right, input.strafe_left) * move_step;
        camera.step_towards(camera.position() + offset, self.settings.smoothing);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn controller() -> FreeCameraController {
        FreeCameraController::new(CameraConfig::default())
    }

    #[test]
    fn test_forward_moves_half_the_step() {
        let controller = controller();
        let mut camera = controller.initial_camera().unwrap();
        let input = CameraInput {
            forward: true,
            ..Default::default()
        };
        controller.update(&mut camera, input, 100.0).unwrap();
        // 100 ms at 0.1 units/ms is 10 units, eased by half
        assert!(camera.position().abs_diff_eq(Vec3::new(-195.0, 50.0, 0.0), 1e-4));
    }

    #[test]
    fn test_strafe_right_is_camera_right() {
        let controller = controller();
        let mut camera = controller.initial_camera().unwrap();
        let input = CameraInput {
            strafe_right: true,
            ..Default::default()
        };
        controller.update(&mut camera, input, 20.0).unwrap();
        assert!(camera.position().z > 0.0);
    }

    #[test]
    fn test_look_up_raises_forward() {
        let controller = controller();
        let mut camera = controller.initial_camera().unwrap();
        let input = CameraInput {
            look_up: true,
            ..Default::default()
        };
        controller.update(&mut camera, input, 100.0).unwrap();
        assert!(camera.forward().y > 0.0);
        assert!((camera.forward().length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_pitch_never_flips_over() {
        let controller = controller();
        let mut camera = controller.initial_camera().unwrap();
        let input = CameraInput {
            look_up: true,
            ..Default::default()
        };
        for _ in 0..200 {
            controller.update(&mut camera, input, 50.0).unwrap();
        }
        let flat = Vec3::new(camera.forward().x, 0.0, camera.forward().z);
        assert!(flat.length() > 0.0);
        assert!(camera.forward().x > 0.0);
    }

    #[test]
    fn test_reset_restores_pose() {
        let controller = controller();
        let mut camera = FlyCamera::new(Vec3::new(5.0, 5.0, 5.0), Vec3::Z).unwrap();
        let input = CameraInput {
            reset: true,
            forward: true,
            ..Default::default()
        };
        controller.update(&mut camera, input, 16.0).unwrap();
        assert_eq!(camera.position(), Vec3::new(-200.0, 30.0, 30.0));
        assert_eq!(camera.forward(), Vec3::X);
    }

    #[test]
    fn test_keys_map_to_input() {
        let keys: HashSet<KeyCode> = [KeyCode::KeyW, KeyCode::ArrowLeft].into_iter().collect();
        let input = CameraInput::from_keys(&keys);
        assert!(input.forward && input.turn_left);
        assert!(!input.back && !input.reset);
    }
}
