//! The sun: light direction for the scene and screen position for a lens flare.

use glam::{Mat4, Vec2, Vec3};
use lakeview_core::frame::FlareOcclusion;
use lakeview_core::skybox::sky_view_projection;

/// Holds the sun direction and the camera of the last drawn frame.
///
/// Only the projection is implemented; occlusion testing against the terrain is not.
#[derive(Debug, Clone)]
pub struct SunFlare {
    light_direction: Vec3,
    view: Mat4,
    projection: Mat4,
}

impl Default for SunFlare {
    fn default() -> Self {
        Self::new(Vec3::new(-1.0, -0.1, 0.3))
    }
}

impl SunFlare {
    /// A sun shining along `light_direction` (normalized; zero falls back to straight down).
    #[must_use]
    pub fn new(light_direction: Vec3) -> Self {
        Self {
            light_direction: light_direction.try_normalize().unwrap_or(Vec3::NEG_Y),
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }

    /// Where the sun appears on screen, in [0, 1] coordinates with a top-left origin,
    /// or `None` when it is behind the camera or outside the depth range.
    #[must_use]
    pub fn sun_screen_position(&self) -> Option<Vec2> {
        let sky = sky_view_projection(self.view, self.projection);
        let clip = sky * (-self.light_direction).extend(1.0);
        if clip.w <= 0.0 || clip.z < 0.0 || clip.z > clip.w {
            return None;
        }
        let ndc = clip.truncate().truncate() / clip.w;
        Some(Vec2::new(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5))
    }
}

impl FlareOcclusion for SunFlare {
    fn light_direction(&self) -> Vec3 {
        self.light_direction
    }

    fn update_camera(&mut self, view: Mat4, projection: Mat4) {
        self.view = view;
        self.projection = projection;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looking(forward: Vec3) -> SunFlare {
        let mut sun = SunFlare::default();
        sun.update_camera(
            Mat4::look_at_rh(Vec3::new(-200.0, 50.0, 0.0), Vec3::new(-200.0, 50.0, 0.0) + forward, Vec3::Y),
            Mat4::perspective_rh(std::f32::consts::FRAC_PI_4, 16.0 / 9.0, 0.1, 1000.0),
        );
        sun
    }

    #[test]
    fn test_light_direction_normalized() {
        assert!((SunFlare::default().light_direction().length() - 1.0).abs() < 1e-6);
        assert_eq!(SunFlare::new(Vec3::ZERO).light_direction(), Vec3::NEG_Y);
    }

    #[test]
    fn test_sun_visible_when_facing_it() {
        let sun = looking(Vec3::new(1.0, 0.1, -0.3));
        let position = sun.sun_screen_position().expect("sun should be in view");
        assert!((position - Vec2::splat(0.5)).length() < 1e-3);
    }

    #[test]
    fn test_sun_hidden_behind_camera() {
        let sun = looking(Vec3::new(-1.0, -0.1, 0.3));
        assert!(sun.sun_screen_position().is_none());
    }
}
