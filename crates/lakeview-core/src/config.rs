//! Scene configuration for lakeview.

use std::path::Path;

use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::{LakeviewError, Result};

/// Cornflower blue, the clear and fog color of the scene.
pub const CORNFLOWER_BLUE: Vec4 = Vec4::new(100.0 / 255.0, 149.0 / 255.0, 237.0 / 255.0, 1.0);

/// Water surface configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WaterConfig {
    /// World-space height of the water plane. Both the drawn surface and the
    /// reflection mirror sit at this height.
    pub height: f32,
    /// Samples per side of the water grid.
    pub tessellation: u32,
    /// Scale applied to the unit grid.
    pub scale: Vec3,
    /// Horizontal (x, z) offset applied after scaling.
    pub offset: Vec2,
    /// Speed of the DUDV ripple scroll, in texture units per second.
    pub wave_speed: f32,
    /// Strength of the DUDV distortion applied to reflection and refraction lookups.
    pub distortion: f32,
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            height: 24.0,
            tessellation: 10,
            scale: Vec3::new(600.0, 1.0, 600.0),
            offset: Vec2::new(25.0, 25.0),
            wave_speed: 0.03,
            distortion: 0.02,
        }
    }
}

impl WaterConfig {
    /// Translation placing the scaled grid in the world, at `height`.
    #[must_use]
    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.offset.x, self.height, self.offset.y)
    }
}

/// Camera configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Start position.
    pub position: Vec3,
    /// Start forward direction.
    pub forward: Vec3,
    /// Vertical field of view of the main camera (radians).
    pub fov_y: f32,
    /// Vertical field of view of the reflection camera (radians).
    pub reflection_fov_y: f32,
    /// Near clip distance.
    pub near: f32,
    /// Far clip distance.
    pub far: f32,
    /// Translation speed in world units per millisecond.
    pub move_speed: f32,
    /// Rotation speed in radians per millisecond.
    pub turn_speed: f32,
    /// Fraction of the remaining distance covered per update.
    pub smoothing: f32,
    /// Position restored by the reset key.
    pub reset_position: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(-200.0, 50.0, 0.0),
            forward: Vec3::X,
            fov_y: std::f32::consts::FRAC_PI_4,
            reflection_fov_y: std::f32::consts::FRAC_PI_2,
            near: 0.1,
            far: 1000.0,
            move_speed: 0.1,
            turn_speed: 0.001,
            smoothing: 0.5,
            reset_position: Vec3::new(-200.0, 30.0, 30.0),
        }
    }
}

impl CameraConfig {
    /// Depth range stored in the scene depth target (`far - near`).
    #[must_use]
    pub fn depth_range(&self) -> f32 {
        self.far - self.near
    }
}

/// Terrain lighting and fog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Ambient intensity.
    pub ambient: f32,
    /// Diffuse intensity of the directional light.
    pub diffuse: f32,
    /// Distance where fog starts.
    pub fog_start: f32,
    /// Distance where fog is opaque.
    pub fog_end: f32,
    /// Fog color (RGB).
    pub fog_color: Vec3,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient: 0.5,
            diffuse: 1.0,
            fog_start: 300.0,
            fog_end: 1000.0,
            fog_color: CORNFLOWER_BLUE.truncate(),
        }
    }
}

/// Full scene configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub water: WaterConfig,
    pub camera: CameraConfig,
    pub lighting: LightingConfig,
    /// Clear color of the back buffer and offscreen color targets.
    pub clear_color: Vec4,
    /// Value the scene depth target is cleared to (the far sentinel).
    pub depth_clear: f32,
    /// Scene color target is `viewport / divisor` on each axis.
    pub scene_color_divisor: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            water: WaterConfig::default(),
            camera: CameraConfig::default(),
            lighting: LightingConfig::default(),
            clear_color: CORNFLOWER_BLUE,
            depth_clear: 1.0,
            scene_color_divisor: 2,
        }
    }
}

impl SceneConfig {
    /// Loads a configuration from a JSON file and validates it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        log::info!("loaded scene configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Parses and validates a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as pretty JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks the values that would otherwise break rendering.
    pub fn validate(&self) -> Result<()> {
        if self.water.tessellation < 2 {
            return Err(LakeviewError::InvalidTessellation(self.water.tessellation));
        }
        if !self.water.height.is_finite() {
            return Err(LakeviewError::Config(format!(
                "water height {} must be finite",
                self.water.height
            )));
        }
        if !(self.camera.near > 0.0 && self.camera.near < self.camera.far) {
            return Err(LakeviewError::Config(format!(
                "near plane {} must be positive and below far plane {}",
                self.camera.near, self.camera.far
            )));
        }
        if self.scene_color_divisor == 0 {
            return Err(LakeviewError::Config(
                "scene_color_divisor must be at least 1".to_string(),
            ));
        }
        if self.lighting.fog_start >= self.lighting.fog_end {
            return Err(LakeviewError::Config(format!(
                "fog_start {} must be below fog_end {}",
                self.lighting.fog_start, self.lighting.fog_end
            )));
        }
        if !(0.0..=1.0).contains(&self.camera.smoothing) {
            return Err(LakeviewError::Config(format!(
                "camera smoothing {} must be within [0, 1]",
                self.camera.smoothing
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_config_default() {
        let config = SceneConfig::default();
        assert_eq!(config.water.height, 24.0);
        assert_eq!(config.water.tessellation, 10);
        assert_eq!(config.camera.far, 1000.0);
        assert_eq!(config.depth_clear, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_depth_range() {
        let camera = CameraConfig::default();
        assert!((camera.depth_range() - 999.9).abs() < 1e-3);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SceneConfig::from_json_str(r#"{ "water": { "height": 10.0 } }"#).unwrap();
        assert_eq!(config.water.height, 10.0);
        assert_eq!(config.water.tessellation, 10);
        assert_eq!(config.camera, CameraConfig::default());
    }

    #[test]
    fn test_water_translation_follows_height() {
        let config = SceneConfig::from_json_str(r#"{ "water": { "height": 10.0 } }"#).unwrap();
        assert_eq!(config.water.translation(), Vec3::new(25.0, 10.0, 25.0));
    }

    #[test]
    fn test_rejects_vertical_water_translation() {
        // the surface height has a single home
        let result = SceneConfig::from_json_str(r#"{ "water": { "translation": [0, 5, 0] } }"#);
        assert!(matches!(result, Err(LakeviewError::Json(_))));
    }

    #[test]
    fn test_rejects_non_finite_water_height() {
        let mut config = SceneConfig::default();
        config.water.height = f32::NAN;
        assert!(matches!(config.validate(), Err(LakeviewError::Config(_))));
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = SceneConfig::default();
        config.lighting.fog_end = 800.0;
        let text = config.to_json_string().unwrap();
        let parsed = SceneConfig::from_json_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_rejects_small_tessellation() {
        let result = SceneConfig::from_json_str(r#"{ "water": { "tessellation": 1 } }"#);
        assert!(matches!(result, Err(LakeviewError::InvalidTessellation(1))));
    }

    #[test]
    fn test_rejects_inverted_clip_range() {
        let result = SceneConfig::from_json_str(r#"{ "camera": { "near": 10.0, "far": 5.0 } }"#);
        assert!(matches!(result, Err(LakeviewError::Config(_))));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let result = SceneConfig::from_json_str("{ water: ");
        assert!(matches!(result, Err(LakeviewError::Json(_))));
    }
}
