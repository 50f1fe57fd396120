//! Free-flying camera with a pitch lock.

use glam::{Mat4, Quat, Vec3};

use crate::error::{LakeviewError, Result};
use crate::reflection::reflect_direction;

/// World up axis.
pub const WORLD_UP: Vec3 = Vec3::Y;

/// Minimum dot product between the pitched forward and the horizontal forward.
///
/// Rotations that would bring the forward vector closer to vertical are rejected,
/// which keeps `forward x up` well defined for the view matrix.
pub const PITCH_LOCK_EPSILON: f32 = 0.001;

/// A camera described by a position and a unit forward direction, with world up fixed to +Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlyCamera {
    position: Vec3,
    forward: Vec3,
}

impl FlyCamera {
    /// Creates a camera, normalizing `forward`.
    ///
    /// Fails when `forward` is zero or parallel to world up.
    pub fn new(position: Vec3, forward: Vec3) -> Result<Self> {
        let forward = forward
            .try_normalize()
            .ok_or(LakeviewError::DegenerateCamera)?;
        if horizontal(forward).is_none() {
            return Err(LakeviewError::DegenerateCamera);
        }
        Ok(Self { position, forward })
    }

    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Unit view direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    /// Unit right vector (`forward x up`).
    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.forward.cross(WORLD_UP).normalize_or_zero()
    }

    /// Right-handed look-at view matrix.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward, WORLD_UP)
    }

    /// Perspective projection with a [0, 1] depth range.
    #[must_use]
    pub fn projection_matrix(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::perspective_rh(fov_y, aspect, near, far)
    }

    /// Applies a pitch (about camera right) and a turn (about world up), in radians.
    ///
    /// Returns `false` and leaves the orientation untouched when the pitched
    /// direction would reach the vertical.
    pub fn rotate(&mut self, pitch: f32, turn: f32) -> bool {
        let Some(flat_forward) = horizontal(self.forward) else {
            return false;
        };
        let right = flat_forward.cross(WORLD_UP);
        let rotation = Quat::from_axis_angle(WORLD_UP, turn) * Quat::from_axis_angle(right, pitch);
        let tilted = rotation * self.forward;
        let turned_flat = Quat::from_axis_angle(WORLD_UP, turn) * flat_forward;

        if tilted.dot(turned_flat) > PITCH_LOCK_EPSILON {
            if let Some(forward) = tilted.try_normalize() {
                if horizontal(forward).is_some() {
                    self.forward = forward;
                    return true;
                }
            }
        }
        false
    }

    /// Moves the position by a world-space offset.
    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
    }

    /// Moves `smoothing` of the way from the current position towards `target`.
    pub fn step_towards(&mut self, target: Vec3, smoothing: f32) {
        self.position = self.position.lerp(target, smoothing.clamp(0.0, 1.0));
    }

    /// Places the camera at `position` looking along `forward`.
    pub fn reset(&mut self, position: Vec3, forward: Vec3) -> Result<()> {
        *self = Self::new(position, forward)?;
        Ok(())
    }

    /// The camera mirrored about the horizontal plane `y = water_height`.
    #[must_use]
    pub fn mirrored(&self, water_height: f32) -> Self {
        let position = Vec3::new(
            self.position.x,
            2.0 * water_height - self.position.y,
            self.position.z,
        );
        let forward = reflect_direction(self.forward, WORLD_UP).normalize();
        Self { position, forward }
    }
}

/// Unit horizontal projection of `direction`, or `None` when it is (near) vertical.
fn horizontal(direction: Vec3) -> Option<Vec3> {
    let flat = Vec3::new(direction.x, 0.0, direction.z);
    if flat.length_squared() < PITCH_LOCK_EPSILON * PITCH_LOCK_EPSILON {
        return None;
    }
    flat.try_normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_camera() -> FlyCamera {
        FlyCamera::new(Vec3::new(-200.0, 50.0, 0.0), Vec3::X).unwrap()
    }

    #[test]
    fn test_new_normalizes_forward() {
        let camera = FlyCamera::new(Vec3::ZERO, Vec3::new(3.0, 0.0, 4.0)).unwrap();
        assert!((camera.forward().length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_new_rejects_vertical_forward() {
        assert!(FlyCamera::new(Vec3::ZERO, Vec3::Y).is_err());
        assert!(FlyCamera::new(Vec3::ZERO, Vec3::NEG_Y).is_err());
        assert!(FlyCamera::new(Vec3::ZERO, Vec3::ZERO).is_err());
    }

    #[test]
    fn test_right_vector() {
        let camera = start_camera();
        assert!(camera.right().abs_diff_eq(Vec3::Z, 1e-6));
    }

    #[test]
    fn test_positive_pitch_looks_up() {
        let mut camera = start_camera();
        assert!(camera.rotate(0.2, 0.0));
        assert!(camera.forward().y > 0.0);
        assert!((camera.forward().length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_turn_keeps_horizontal() {
        let mut camera = start_camera();
        assert!(camera.rotate(0.0, std::f32::consts::FRAC_PI_2));
        assert!(camera.forward().y.abs() < 1e-6);
        assert!(camera.forward().abs_diff_eq(Vec3::NEG_Z, 1e-5));
    }

    #[test]
    fn test_pitch_lock_rejects_vertical() {
        let mut camera = start_camera();
        let before = camera.forward();
        assert!(!camera.rotate(std::f32::consts::FRAC_PI_2, 0.0));
        assert_eq!(camera.forward(), before);
    }

    #[test]
    fn test_repeated_pitch_never_passes_vertical() {
        let mut camera = start_camera();
        for _ in 0..10_000 {
            camera.rotate(0.001 * 16.0, 0.0);
        }
        let forward = camera.forward();
        assert!(forward.y < 1.0);
        assert!(Vec3::new(forward.x, 0.0, forward.z).length() > 0.0);
        assert!(forward.x > 0.0);
    }

    #[test]
    fn test_step_towards() {
        let mut camera = start_camera();
        camera.step_towards(Vec3::new(-100.0, 50.0, 0.0), 0.5);
        assert!(camera.position().abs_diff_eq(Vec3::new(-150.0, 50.0, 0.0), 1e-4));
    }

    #[test]
    fn test_reset() {
        let mut camera = start_camera();
        camera.rotate(0.3, 1.0);
        camera.reset(Vec3::new(-200.0, 30.0, 30.0), Vec3::X).unwrap();
        assert_eq!(camera.position(), Vec3::new(-200.0, 30.0, 30.0));
        assert_eq!(camera.forward(), Vec3::X);
    }

    #[test]
    fn test_mirrored_camera() {
        let camera = start_camera();
        let mirrored = camera.mirrored(24.0);
        assert!(mirrored.position().abs_diff_eq(Vec3::new(-200.0, -2.0, 0.0), 1e-5));
        assert!(mirrored.forward().abs_diff_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn test_mirrored_camera_flips_pitch() {
        let mut camera = start_camera();
        camera.rotate(-0.3, 0.0);
        let mirrored = camera.mirrored(24.0);
        assert!((mirrored.forward().y + camera.forward().y).abs() < 1e-6);
        assert!((mirrored.forward().x - camera.forward().x).abs() < 1e-6);
    }

    #[test]
    fn test_view_matrix_moves_eye_to_origin() {
        let camera = start_camera();
        let eye = camera.view_matrix().transform_point3(camera.position());
        assert!(eye.abs_diff_eq(Vec3::ZERO, 1e-4));
    }
}
