//! Water surface geometry and composite state.

use glam::{Mat4, Vec3};

use crate::config::WaterConfig;
use crate::error::{LakeviewError, Result};
use crate::state::{BlendMode, DepthMode, SamplerState, StateOverlay};

/// Texture slot of the scene depth target.
pub const SLOT_SCENE_DEPTH: usize = 0;
/// Texture slot of the reflection target.
pub const SLOT_REFLECTION: usize = 1;
/// Texture slot of the half-resolution scene color target.
pub const SLOT_SCENE_COLOR: usize = 2;
/// Texture slot of the DUDV offset map.
pub const SLOT_OFFSET_MAP: usize = 3;
/// Texture slot of the surface normal map.
pub const SLOT_NORMAL_MAP: usize = 4;

/// Device state the water composite draws with.
///
/// Depth is point-sampled since it is a float target; the two color targets are
/// sampled linearly and clamped so projective lookups never wrap across the screen.
pub const COMPOSITE_STATE: StateOverlay = StateOverlay {
    blend: Some(BlendMode::Opaque),
    depth: Some(DepthMode::Default),
    cull: None,
    samplers: &[
        (SLOT_SCENE_DEPTH, SamplerState::POINT_CLAMP),
        (SLOT_REFLECTION, SamplerState::LINEAR_CLAMP),
        (SLOT_SCENE_COLOR, SamplerState::LINEAR_CLAMP),
        (SLOT_OFFSET_MAP, SamplerState::LINEAR_WRAP),
        (SLOT_NORMAL_MAP, SamplerState::LINEAR_WRAP),
    ],
};

/// A single water vertex.
///
/// `grid` carries the local grid coordinates and `uv` the texture coordinates in [0, 1].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct WaterVertex {
    pub position: [f32; 3],
    pub grid: [f32; 3],
    pub uv: [f32; 2],
}

/// A flat unit grid centered on the origin in the XZ plane, as a non-indexed triangle list.
#[derive(Debug, Clone)]
pub struct WaterGrid {
    tessellation: u32,
    vertices: Vec<WaterVertex>,
}

impl WaterGrid {
    /// Half the side length of the unit grid.
    pub const HALF_LENGTH: f32 = 0.5;

    /// Builds a grid with `tessellation` samples per side.
    pub fn new(tessellation: u32) -> Result<Self> {
        if tessellation < 2 {
            return Err(LakeviewError::InvalidTessellation(tessellation));
        }

        let cells = tessellation - 1;
        let vertex = |i: u32, j: u32| {
            let u = i as f32 / cells as f32;
            let v = j as f32 / cells as f32;
            let x = u - Self::HALF_LENGTH;
            let z = v - Self::HALF_LENGTH;
            WaterVertex {
                position: [x, 0.0, z],
                grid: [x, 0.0, z],
                uv: [u, v],
            }
        };

        let mut vertices = Vec::with_capacity(Self::vertex_count_for(tessellation));
        for j in 0..cells {
            for i in 0..cells {
                // Counter-clockwise when seen from above
                vertices.push(vertex(i, j));
                vertices.push(vertex(i, j + 1));
                vertices.push(vertex(i + 1, j));

                vertices.push(vertex(i + 1, j));
                vertices.push(vertex(i, j + 1));
                vertices.push(vertex(i + 1, j + 1));
            }
        }

        Ok(Self {
            tessellation,
            vertices,
        })
    }

    /// `6 (T-1)^2`.
    #[must_use]
    pub fn vertex_count_for(tessellation: u32) -> usize {
        let cells = tessellation.saturating_sub(1) as usize;
        6 * cells * cells
    }

    #[must_use]
    pub fn tessellation(&self) -> u32 {
        self.tessellation
    }

    #[must_use]
    pub fn vertices(&self) -> &[WaterVertex] {
        &self.vertices
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// `2 (T-1)^2`.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }
}

/// Placement of one water instance: scale the unit grid, then translate it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterTransform {
    pub scale: Vec3,
    pub translation: Vec3,
}

impl WaterTransform {
    #[must_use]
    pub fn new(scale: Vec3, translation: Vec3) -> Self {
        Self { scale, translation }
    }

    #[must_use]
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translation) * Mat4::from_scale(self.scale)
    }

    /// World height of the (flat) surface.
    #[must_use]
    pub fn surface_height(&self) -> f32 {
        self.translation.y
    }
}

impl From<&WaterConfig> for WaterTransform {
    fn from(config: &WaterConfig) -> Self {
        Self::new(config.scale, config.translation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_counts_default_tessellation() {
        let grid = WaterGrid::new(10).unwrap();
        assert_eq!(grid.vertex_count(), 486);
        assert_eq!(grid.triangle_count(), 162);
    }

    #[test]
    fn test_smallest_grid() {
        let grid = WaterGrid::new(2).unwrap();
        assert_eq!(grid.vertex_count(), 6);
        assert_eq!(grid.triangle_count(), 2);
    }

    #[test]
    fn test_rejects_degenerate_tessellation() {
        assert!(matches!(
            WaterGrid::new(1),
            Err(LakeviewError::InvalidTessellation(1))
        ));
        assert!(WaterGrid::new(0).is_err());
    }

    #[test]
    fn test_grid_covers_unit_square() {
        let grid = WaterGrid::new(10).unwrap();
        let (mut min, mut max) = (f32::MAX, f32::MIN);
        for v in grid.vertices() {
            assert_eq!(v.position[1], 0.0);
            min = min.min(v.position[0]).min(v.position[2]);
            max = max.max(v.position[0]).max(v.position[2]);
            for uv in v.uv {
                assert!((0.0..=1.0).contains(&uv));
            }
        }
        assert!((min + 0.5).abs() < 1e-6);
        assert!((max - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_triangles_face_up() {
        let grid = WaterGrid::new(4).unwrap();
        for tri in grid.vertices().chunks_exact(3) {
            let a = Vec3::from(tri[0].position);
            let b = Vec3::from(tri[1].position);
            let c = Vec3::from(tri[2].position);
            assert!((b - a).cross(c - a).y > 0.0);
        }
    }

    #[test]
    fn test_default_world_matrix() {
        let transform = WaterTransform::from(&WaterConfig::default());
        let m = transform.world_matrix();
        let corner = m.transform_point3(Vec3::new(0.5, 0.0, -0.5));
        assert!(corner.abs_diff_eq(Vec3::new(325.0, 24.0, -275.0), 1e-3));
        assert_eq!(transform.surface_height(), 24.0);
    }

    #[test]
    fn test_drawn_surface_matches_reflection_plane() {
        let config = WaterConfig {
            height: 10.0,
            ..WaterConfig::default()
        };
        let transform = WaterTransform::from(&config);
        assert_eq!(transform.surface_height(), config.height);
        let center = transform.world_matrix().transform_point3(Vec3::ZERO);
        assert!((center.y - config.height).abs() < 1e-6);
    }

    #[test]
    fn test_composite_state_samplers() {
        let slots: Vec<usize> = COMPOSITE_STATE.samplers.iter().map(|(s, _)| *s).collect();
        assert_eq!(slots, vec![0, 1, 2, 3, 4]);
        assert_eq!(COMPOSITE_STATE.samplers[0].1, SamplerState::POINT_CLAMP);
    }
}
