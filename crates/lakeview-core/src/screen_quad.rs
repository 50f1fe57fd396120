//! Full-screen (or partial-screen) quad geometry.

use glam::Vec2;

use crate::state::{CullMode, DepthMode, SamplerState, StateOverlay};

/// How the rasterizer maps texels to pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TexelConvention {
    /// Pixel centers sit on integer coordinates; the quad is shifted by half a pixel.
    HalfTexelOffset,
    /// Pixel centers sit at half-integer coordinates already (D3D10+, Vulkan, Metal, wgpu).
    #[default]
    PixelCenters,
}

/// A quad vertex in normalized device coordinates.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Two triangles over the four corners.
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// Screen quads draw on top with no depth and no culling; point sampling works for
/// every target format including float depth.
pub const QUAD_STATE: StateOverlay = StateOverlay {
    blend: None,
    depth: Some(DepthMode::Disabled),
    cull: Some(CullMode::None),
    samplers: &[(0, SamplerState::POINT_CLAMP)],
};

/// Corner texture coordinates: (1,1), (0,1), (0,0), (1,0).
const QUAD_UVS: [[f32; 2]; 4] = [[1.0, 1.0], [0.0, 1.0], [0.0, 0.0], [1.0, 0.0]];

/// Quad builder for a viewport of a given size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenQuad {
    half_pixel: Vec2,
}

impl ScreenQuad {
    #[must_use]
    pub fn new(width: u32, height: u32, convention: TexelConvention) -> Self {
        let half_pixel = match convention {
            TexelConvention::HalfTexelOffset if width > 0 && height > 0 => {
                Vec2::new(0.5 / width as f32, -0.5 / height as f32)
            }
            _ => Vec2::ZERO,
        };
        Self { half_pixel }
    }

    #[must_use]
    pub fn half_pixel(&self) -> Vec2 {
        self.half_pixel
    }

    /// Corners spanning `v1` (bottom-left) to `v2` (top-right) in NDC, shifted by the half pixel.
    #[must_use]
    pub fn vertices(&self, v1: Vec2, v2: Vec2) -> [QuadVertex; 4] {
        let corners = [
            Vec2::new(v2.x, v1.y),
            Vec2::new(v1.x, v1.y),
            Vec2::new(v1.x, v2.y),
            Vec2::new(v2.x, v2.y),
        ];
        let mut out = [QuadVertex {
            position: [0.0; 3],
            uv: [0.0; 2],
        }; 4];
        for (vertex, (corner, uv)) in out.iter_mut().zip(corners.iter().zip(QUAD_UVS)) {
            let p = *corner - self.half_pixel;
            *vertex = QuadVertex {
                position: [p.x, p.y, 0.0],
                uv,
            };
        }
        out
    }

    /// Covers the whole viewport.
    #[must_use]
    pub fn full_screen(&self) -> [QuadVertex; 4] {
        self.vertices(Vec2::NEG_ONE, Vec2::ONE)
    }
}

/// A rectangle inset into one corner of the screen, in NDC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub min: Vec2,
    pub max: Vec2,
}

impl ScreenRect {
    /// Bottom-right inset covering `fraction` of each screen axis.
    #[must_use]
    pub fn bottom_right(fraction: f32) -> Self {
        let size = 2.0 * fraction.clamp(0.0, 1.0);
        Self {
            min: Vec2::new(1.0 - size, -1.0),
            max: Vec2::new(1.0, -1.0 + size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_pixel_offset() {
        let quad = ScreenQuad::new(1280, 720, TexelConvention::HalfTexelOffset);
        assert!((quad.half_pixel().x - 0.5 / 1280.0).abs() < 1e-9);
        assert!((quad.half_pixel().y + 0.5 / 720.0).abs() < 1e-9);

        let vertices = quad.full_screen();
        assert!((vertices[1].position[0] - (-1.0 - 0.5 / 1280.0)).abs() < 1e-6);
        assert!((vertices[1].position[1] - (-1.0 + 0.5 / 720.0)).abs() < 1e-6);
    }

    #[test]
    fn test_pixel_centers_have_no_offset() {
        let quad = ScreenQuad::new(1280, 720, TexelConvention::PixelCenters);
        assert_eq!(quad.half_pixel(), Vec2::ZERO);
        let vertices = quad.full_screen();
        assert_eq!(vertices[0].position, [1.0, -1.0, 0.0]);
        assert_eq!(vertices[2].position, [-1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_zero_viewport_has_no_offset() {
        let quad = ScreenQuad::new(0, 720, TexelConvention::HalfTexelOffset);
        assert_eq!(quad.half_pixel(), Vec2::ZERO);
    }

    #[test]
    fn test_corner_uvs() {
        let vertices = ScreenQuad::new(800, 600, TexelConvention::PixelCenters).full_screen();
        let uvs: Vec<[f32; 2]> = vertices.iter().map(|v| v.uv).collect();
        assert_eq!(uvs, QUAD_UVS.to_vec());
        // Top-left of the screen samples the top-left of the texture
        assert_eq!(vertices[2].uv, [0.0, 0.0]);
    }

    #[test]
    fn test_bottom_right_rect() {
        let rect = ScreenRect::bottom_right(0.25);
        assert_eq!(rect.min, Vec2::new(0.5, -1.0));
        assert_eq!(rect.max, Vec2::new(1.0, -0.5));
    }
}
