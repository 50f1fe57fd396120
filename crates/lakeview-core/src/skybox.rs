//! Skybox cube geometry.

use glam::{Mat4, Vec4};

use crate::state::{CullMode, DepthMode, SamplerState, StateOverlay};

/// Corners of the unit cube, top face first.
pub const SKY_VERTICES: [[f32; 3]; 8] = [
    [-1.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, -1.0, -1.0],
    [-1.0, -1.0, -1.0],
];

/// Twelve triangles, two per face: top, bottom, front, back, left, right.
pub const SKY_INDICES: [u16; 36] = [
    0, 1, 3, 2, 3, 1, // top
    5, 4, 6, 7, 6, 4, // bottom
    3, 2, 7, 6, 7, 2, // front
    1, 0, 4, 4, 5, 1, // back
    0, 3, 4, 4, 3, 7, // left
    2, 1, 6, 5, 6, 1, // right
];

/// The sky is drawn behind everything: no depth test or write, no culling.
pub const SKY_STATE: StateOverlay = StateOverlay {
    blend: None,
    depth: Some(DepthMode::Disabled),
    cull: Some(CullMode::None),
    samplers: &[(0, SamplerState::LINEAR_CLAMP)],
};

/// `projection * view` with the view's translation removed, so the cube stays
/// centered on the eye.
#[must_use]
pub fn sky_view_projection(view: Mat4, projection: Mat4) -> Mat4 {
    let mut rotation_only = view;
    rotation_only.w_axis = Vec4::W;
    projection * rotation_only
}
